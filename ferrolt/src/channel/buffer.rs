//! Output buffer with tail-only prompt search.
//!
//! `show card` on a fully populated chassis can push the buffer well past
//! the prompt itself, so only the last `search_depth` bytes are matched.

use regex::bytes::Regex;

/// Device output since the last completed read, ANSI-free.
#[derive(Debug)]
pub struct PatternBuffer {
    data: Vec<u8>,
    search_depth: usize,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            data: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append raw channel output with terminal escape sequences removed.
    pub fn push(&mut self, raw: &[u8]) {
        self.data.extend(strip_ansi_escapes::strip(raw));
    }

    /// True once `pattern` occurs in the searched tail.
    pub fn matches_tail(&self, pattern: &Regex) -> bool {
        let from = self.data.len().saturating_sub(self.search_depth);
        pattern.is_match(&self.data[from..])
    }

    /// Hand back everything buffered and start over.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
