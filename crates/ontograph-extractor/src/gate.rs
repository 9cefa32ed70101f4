//! Global ceiling on in-flight chunk extractions

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::GateClosed;

/// Default number of chunks extracted at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Counting gate shared by every chunk of every document in a run
///
/// Admission is FIFO. The permit is released when the wrapped future
/// finishes, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl ConcurrencyGate {
    /// A limit of zero is treated as one
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for admission, then drive `fut` to completion
    ///
    /// `fut` is never polled without a permit.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, GateClosed> {
        let _permit = self.semaphore.acquire().await.map_err(|_| GateClosed)?;
        Ok(fut.await)
    }
}
