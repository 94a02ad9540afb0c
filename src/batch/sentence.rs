//! Input sentence records.
//!
//! One record per input line. Records carry the original line index so
//! output order can be restored after length-based reshuffling, plus
//! the parsed token content, which this pipeline treats as opaque.

/// A single input unit, immutable once created.
#[derive(Debug, Clone)]
pub struct Sentence {
    /// Position of this sentence in the original input stream.
    index: u64,

    /// Parsed content; produced by the external tokenizer.
    tokens: Vec<u32>,
}

impl Sentence {
    /// Create a record for input line `index`.
    pub fn new(index: u64, tokens: Vec<u32>) -> Self {
        Self { index, tokens }
    }

    /// Original input stream position.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Length in tokens. Zero-length sentences are valid inputs.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the sentence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token content.
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_accessors() {
        let s = Sentence::new(7, vec![3, 1, 4]);
        assert_eq!(s.index(), 7);
        assert_eq!(s.len(), 3);
        assert_eq!(s.tokens(), &[3, 1, 4]);
    }

    #[test]
    fn test_zero_length_sentence_is_valid() {
        let s = Sentence::new(0, vec![]);
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }
}
