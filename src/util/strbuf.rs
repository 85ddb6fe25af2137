//! Append-only string building.

use std::fmt;

/// Minimum capacity of a fresh builder.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Append-only text builder backed by one geometrically growing buffer.
///
/// Appends are amortized O(1). [`StringBuilder::build`] copies the text once;
/// [`StringBuilder::into_string`] hands the buffer over without copying.
#[derive(Debug, Clone)]
pub struct StringBuilder {
    buf: String,
}

impl StringBuilder {
    pub fn new() -> Self {
        StringBuilder::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a builder with room for at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        StringBuilder {
            buf: String::with_capacity(capacity.max(DEFAULT_CAPACITY)),
        }
    }

    fn reserve_for(&mut self, extra: usize) {
        let len = self.buf.len();
        if self.buf.capacity() - len >= extra {
            return;
        }

        let target = (self.buf.capacity() * 2)
            .max(len + extra)
            .max(DEFAULT_CAPACITY);
        self.buf.reserve_exact(target - len);
    }

    pub fn push(&mut self, c: char) {
        self.reserve_for(c.len_utf8());
        self.buf.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.reserve_for(s.len());
        self.buf.push_str(s);
    }

    /// Append a line followed by `\n`.
    pub fn push_line(&mut self, s: &str) {
        self.push_str(s);
        self.push('\n');
    }

    /// Append formatted text.
    pub fn push_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Writing into a String cannot fail.
        let _ = fmt::Write::write_fmt(self, args);
    }

    /// Whether the text so far ends with `\n` (or is empty).
    pub fn at_line_start(&self) -> bool {
        self.buf.is_empty() || self.buf.ends_with('\n')
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Materialize the text into a freshly owned string.
    pub fn build(&self) -> String {
        self.buf.clone()
    }

    /// Consume the builder, returning its buffer.
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for StringBuilder {
    fn default() -> Self {
        StringBuilder::new()
    }
}

impl fmt::Write for StringBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl fmt::Display for StringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_appends() {
        let mut sb = StringBuilder::new();
        sb.push_str("hello");
        sb.push(',');
        sb.push(' ');
        sb.push_fmt(format_args!("{}!", "world"));

        assert_eq!(sb.as_str(), "hello, world!");
        assert_eq!(sb.build(), "hello, world!");
        assert_eq!(sb.into_string(), "hello, world!");
    }

    #[test]
    fn test_builder_minimum_capacity() {
        let sb = StringBuilder::with_capacity(16);
        assert!(sb.capacity() >= DEFAULT_CAPACITY);
    }

    #[test]
    fn test_builder_grows_past_default() {
        let chunk = "x".repeat(1000);
        let mut sb = StringBuilder::new();
        for _ in 0..10 {
            sb.push_str(&chunk);
        }

        assert_eq!(sb.len(), 10_000);
        assert!(sb.capacity() >= 10_000);
        assert!(sb.as_str().chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_at_line_start() {
        let mut sb = StringBuilder::new();
        assert!(sb.at_line_start());
        sb.push_str("abc");
        assert!(!sb.at_line_start());
        sb.push_line("");
        assert!(sb.at_line_start());
    }
}
