//! Lenient JSON recovery for LLM output
//!
//! Models asked for "only JSON" still wrap it in markdown fences, add a
//! sentence of preamble, leave trailing commas, use single quotes or Python
//! literals, or stop mid-object when they hit the token limit. The reader
//! here accepts all of that and re-emits strict JSON text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::ParseError;

const MAX_DEPTH: usize = 128;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
});

/// Repair near-JSON text into strict JSON text
pub fn repair_json(raw: &str) -> Result<String, ParseError> {
    let value = parse_lenient(raw)?;
    serde_json::to_string(&value).map_err(|e| ParseError::Malformed(e.to_string()))
}

/// Parse near-JSON text into a value
pub fn parse_lenient(raw: &str) -> Result<Value, ParseError> {
    let body = strip_code_fence(raw);

    // Fast path for well-behaved models
    if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
        return Ok(value);
    }

    let start = body
        .find(|c| c == '{' || c == '[')
        .ok_or(ParseError::NoJson)?;
    let mut reader = Reader::new(&body[start..]);
    reader.value(0)
}

/// Contents of the first fenced block, or the input unchanged
fn strip_code_fence(raw: &str) -> &str {
    if let Some(captures) = CODE_FENCE.captures(raw) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str();
        }
    }
    // Unterminated fence: drop the opening line
    match raw.trim_start().strip_prefix("```") {
        Some(rest) => rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest),
        None => raw,
    }
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.bump(), Some('\n') | None) {}
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.pos += 1;
                            break;
                        }
                    }
                }
                Some('#') => {
                    while !matches!(self.bump(), Some('\n') | None) {}
                }
                _ => return,
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_DEPTH {
            return Err(ParseError::Malformed("nesting too deep".to_string()));
        }
        self.skip_trivia();
        match self.peek() {
            None => Ok(Value::Null),
            Some('{') => self.object(depth),
            Some('[') => self.array(depth),
            Some(q @ ('"' | '\'' | '\u{201c}')) => {
                self.pos += 1;
                Ok(Value::String(self.string(closing_quote(q))))
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                Ok(self.number())
            }
            Some(_) => Ok(self.bare_word()),
        }
    }

    fn object(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                // Mismatched closer: the object ends here
                Some(']') => break,
                _ => {}
            }

            let key = self.key();
            self.skip_trivia();
            let value = match self.peek() {
                Some(':') | Some('=') => {
                    self.pos += 1;
                    self.value(depth + 1)?
                }
                Some(',') | Some('}') | None => Value::Null,
                _ => self.value(depth + 1)?,
            };

            if !key.is_empty() {
                map.insert(key, value);
            }
        }

        Ok(Value::Object(map))
    }

    fn array(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => break,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                Some('}') => break,
                Some(':') => {
                    // Stray separator, skip it
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let before = self.pos;
            items.push(self.value(depth + 1)?);
            if self.pos == before {
                self.pos += 1;
            }
        }

        Ok(Value::Array(items))
    }

    fn key(&mut self) -> String {
        match self.peek() {
            Some(q @ ('"' | '\'' | '\u{201c}')) => {
                self.pos += 1;
                self.string(closing_quote(q))
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ':' || c == ',' || c == '}' || c == '=' || c.is_whitespace() {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    // Unusable char in key position
                    self.pos += 1;
                    return String::new();
                }
                self.chars[start..self.pos].iter().collect()
            }
        }
    }

    fn string(&mut self, quote: char) -> String {
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return out;
            }
            if c == '\\' {
                match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('u') => out.push(self.unicode_escape()),
                    Some(other) => out.push(other),
                    None => break,
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn unicode_escape(&mut self) -> char {
        let end = (self.pos + 4).min(self.chars.len());
        let hex: String = self.chars[self.pos..end].iter().collect();
        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
            Some(c) if hex.len() == 4 => {
                self.pos = end;
                c
            }
            _ => char::REPLACEMENT_CHARACTER,
        }
    }

    fn number(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let trimmed = text.trim_start_matches('+');

        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Number(Number::from(i));
        }
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
        Value::String(text)
    }

    fn bare_word(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n' | ':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1;
            return Value::Null;
        }

        let word: String = self.chars[start..self.pos].iter().collect();
        match word.trim() {
            "true" | "True" | "TRUE" => Value::Bool(true),
            "false" | "False" | "FALSE" => Value::Bool(false),
            "null" | "None" | "undefined" | "NaN" | "nil" => Value::Null,
            other => Value::String(other.to_string()),
        }
    }
}

fn closing_quote(open: char) -> char {
    match open {
        '\u{201c}' => '\u{201d}',
        other => other,
    }
}
