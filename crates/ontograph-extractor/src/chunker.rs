//! Token-bounded chunking
//!
//! Documents are split with text-splitter's semantic levels (paragraphs,
//! sentences, words) while chunk length is measured in `cl100k_base` tokens.
//! If the BPE tables cannot be loaded the chunker measures characters instead.

use once_cell::sync::Lazy;
use std::sync::Arc;
use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use crate::ChunkError;

static CL100K: Lazy<Option<Arc<CoreBPE>>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(Arc::new(bpe)),
    Err(e) => {
        warn!(error = %e, "cl100k_base tokenizer unavailable, measuring chunks in characters");
        None
    }
});

/// Length function used to bound chunks
#[derive(Clone)]
pub enum TokenSizer {
    /// BPE token count
    Bpe(Arc<CoreBPE>),
    /// Unicode scalar count
    Characters,
}

impl TokenSizer {
    /// The `cl100k_base` tokenizer, or characters if it failed to load
    pub fn cl100k() -> Self {
        match CL100K.as_ref() {
            Some(bpe) => Self::Bpe(Arc::clone(bpe)),
            None => Self::Characters,
        }
    }

    pub fn count(&self, text: &str) -> usize {
        match self {
            Self::Bpe(bpe) => bpe.encode_ordinary(text).len(),
            Self::Characters => text.chars().count(),
        }
    }

    pub fn is_token_based(&self) -> bool {
        matches!(self, Self::Bpe(_))
    }
}

impl std::fmt::Debug for TokenSizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bpe(_) => write!(f, "TokenSizer::Bpe(cl100k_base)"),
            Self::Characters => write!(f, "TokenSizer::Characters"),
        }
    }
}

impl ChunkSizer for TokenSizer {
    fn size(&self, chunk: &str) -> usize {
        self.count(chunk)
    }
}

/// Splits document text into overlapping, token-bounded chunks
pub struct Chunker {
    splitter: TextSplitter<TokenSizer>,
    sizer: TokenSizer,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Chunker {
    /// Create a chunker measuring with `cl100k_base`
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self, ChunkError> {
        Self::with_sizer(max_tokens, overlap_tokens, TokenSizer::cl100k())
    }

    /// Create a chunker with an explicit length function
    pub fn with_sizer(
        max_tokens: usize,
        overlap_tokens: usize,
        sizer: TokenSizer,
    ) -> Result<Self, ChunkError> {
        if max_tokens == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap_tokens >= max_tokens {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk overlap ({overlap_tokens}) must be smaller than chunk size ({max_tokens})"
            )));
        }

        let config = ChunkConfig::new(max_tokens)
            .with_sizer(sizer.clone())
            .with_trim(false)
            .with_overlap(overlap_tokens)
            .map_err(|e| ChunkError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            sizer,
            max_tokens,
            overlap_tokens,
        })
    }

    /// Split text into chunks; blank text yields none
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunks: Vec<String> = self.splitter.chunks(text).map(str::to_string).collect();
        debug!(
            chunks = chunks.len(),
            max_tokens = self.max_tokens,
            overlap = self.overlap_tokens,
            "Split text"
        );
        chunks
    }

    /// Length of `text` under this chunker's measure
    pub fn measure(&self, text: &str) -> usize {
        self.sizer.count(text)
    }

    pub fn sizer(&self) -> &TokenSizer {
        &self.sizer
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Paragraph {i}: Alice works at Acme. Acme is located in Reno. \
                 Bob manages the Reno office and reports to Alice.\n\n"
            ));
        }
        text.trim_end().to_string()
    }

    #[test]
    fn test_overlap_must_be_smaller() {
        assert!(matches!(
            Chunker::new(100, 100),
            Err(ChunkError::InvalidConfig(_))
        ));
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(0, 0).is_err());
    }

    #[test]
    fn test_blank_text_yields_no_chunks() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = Chunker::new(4000, 200).unwrap();
        let text = "Alice works at Acme. Acme is located in Reno.";
        assert_eq!(chunker.split(text), vec![text.to_string()]);
    }

    #[test]
    fn test_chunks_respect_limit() {
        let chunker = Chunker::new(50, 10).unwrap();
        for chunk in chunker.split(&sample_text()) {
            assert!(chunker.measure(&chunk) <= 50, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_zero_overlap_concatenates_to_input() {
        let text = sample_text();
        let chunker = Chunker::new(40, 0).unwrap();
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_overlapping_chunks_cover_input() {
        let text = sample_text();
        let chunker = Chunker::new(60, 15).unwrap();
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        assert!(text.starts_with(chunks.first().unwrap().as_str()));
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
        for chunk in &chunks {
            assert!(text.contains(chunk.as_str()));
        }
    }

    #[test]
    fn test_character_sizer() {
        let chunker = Chunker::with_sizer(20, 0, TokenSizer::Characters).unwrap();
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunker.split(text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks.concat(), text);
    }
}
