//! Output reordering.
//!
//! Jobs complete in arbitrary order; translations carry the original
//! sentence index, and the collector holds completed lines until their
//! index is next, then writes the contiguous prefix. Final output
//! order always matches input order.

use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::debug;

/// One completed translation, keyed by original input position.
#[derive(Debug, Clone)]
pub struct Translation {
    pub index: u64,
    pub text: String,
}

/// Buffers out-of-order translations and writes them in input order.
pub struct OutputCollector<W: Write> {
    /// Next index to write.
    next_index: u64,

    /// Completed translations waiting for their turn.
    pending: BTreeMap<u64, String>,

    out: W,
}

impl<W: Write> OutputCollector<W> {
    pub fn new(out: W) -> Self {
        Self {
            next_index: 0,
            pending: BTreeMap::new(),
            out,
        }
    }

    /// Accept one translation, flushing any now-contiguous prefix.
    pub fn add(&mut self, translation: Translation) -> io::Result<()> {
        self.pending.insert(translation.index, translation.text);
        while let Some(text) = self.pending.remove(&self.next_index) {
            writeln!(self.out, "{text}")?;
            self.next_index += 1;
        }
        Ok(())
    }

    /// Translations buffered waiting on earlier indices.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Lines written so far.
    pub fn written_count(&self) -> u64 {
        self.next_index
    }

    /// Flush the writer and hand it back.
    ///
    /// Anything still pending points at a gap in the index sequence —
    /// logged, since the pipeline invariants say it cannot happen.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.pending.is_empty() {
            debug!(
                pending = self.pending.len(),
                next_index = self.next_index,
                "Output collector finished with gaps"
            );
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(index: u64, text: &str) -> Translation {
        Translation {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_out_of_order_completions_write_in_input_order() {
        let mut collector = OutputCollector::new(Vec::new());

        collector.add(t(2, "third")).unwrap();
        collector.add(t(1, "second")).unwrap();
        assert_eq!(collector.written_count(), 0);
        assert_eq!(collector.pending_count(), 2);

        collector.add(t(0, "first")).unwrap();
        assert_eq!(collector.written_count(), 3);

        let out = collector.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_in_order_stream_writes_immediately() {
        let mut collector = OutputCollector::new(Vec::new());
        for i in 0..5 {
            collector.add(t(i, "line")).unwrap();
            assert_eq!(collector.pending_count(), 0);
        }
        assert_eq!(collector.written_count(), 5);
    }
}
