//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of `/proc` files into
//! structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parsed data from `/proc/meminfo`, values in bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    entries: HashMap<String, u64>,
}

impl MemInfo {
    /// Returns the value for `key` in bytes, or 0 if the kernel did not report it.
    pub fn get(&self, key: &str) -> u64 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    pub fn mem_total(&self) -> u64 {
        self.get("MemTotal")
    }

    pub fn mem_free(&self) -> u64 {
        self.get("MemFree")
    }

    pub fn buffers(&self) -> u64 {
        self.get("Buffers")
    }

    pub fn cached(&self) -> u64 {
        self.get("Cached")
    }

    pub fn swap_total(&self) -> u64 {
        self.get("SwapTotal")
    }

    pub fn swap_free(&self) -> u64 {
        self.get("SwapFree")
    }

    /// Number of keys parsed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses `/proc/meminfo` content.
///
/// Every line must have the form `Key:<whitespace><digits>[ kB]`. Values are
/// reported by the kernel in kilobytes and converted to bytes. A single
/// malformed line fails the whole parse.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut entries = HashMap::new();

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        let (key, rest) = line
            .split_once(':')
            .ok_or_else(|| ParseError::new(format!("invalid format at line {}", lineno)))?;

        if key.is_empty() || !rest.starts_with(char::is_whitespace) {
            return Err(ParseError::new(format!("invalid format at line {}", lineno)));
        }

        let value: u64 = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new(format!("missing value for {}", key)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid value for {}", key)))?;

        let bytes = value
            .checked_mul(1024)
            .ok_or_else(|| ParseError::new(format!("value for {} overflows", key)))?;

        entries.insert(key.to_string(), bytes);
    }

    Ok(MemInfo { entries })
}
