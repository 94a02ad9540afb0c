//! Two-stage batch formation: maxi batches cut into mini batches.
//!
//! Sentences accumulate into a maxi batch up to a configured capacity
//! (or stream exhaustion), get sorted once by length so neighbouring
//! sentences pad to similar extents, then are drained from the front
//! into bounded mini batches. Each sentence lands in exactly one mini
//! batch; an empty cut signals exhaustion.

use std::collections::VecDeque;

use tracing::debug;

use crate::batch::sentence::Sentence;

/// The coarse accumulation unit of the pipeline.
#[derive(Debug)]
pub struct MaxiBatch {
    /// Configured capacity in sentences.
    capacity: usize,

    records: VecDeque<Sentence>,
}

impl MaxiBatch {
    /// Create an empty maxi batch with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sentence. O(1) amortized.
    pub fn accept(&mut self, sentence: Sentence) {
        self.records.push_back(sentence);
    }

    /// Whether the batch has reached its configured capacity.
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    /// Sentences currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no sentences.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort the accumulated sentences by length.
    ///
    /// Length-homogeneous neighbourhoods minimize padding waste in the
    /// downstream device computation. The sort is stable, so equal
    /// lengths keep arrival order.
    pub fn finalize(&mut self) {
        self.records.make_contiguous().sort_by_key(Sentence::len);
        debug!(sentences = self.records.len(), "Maxi batch finalized");
    }

    /// Cut up to `mini_size` sentences from the front.
    ///
    /// Relative order among the removed sentences is preserved. Returns
    /// an empty mini batch once the maxi batch is exhausted; every
    /// sentence is returned by exactly one call.
    pub fn next_mini_batch(&mut self, mini_size: usize) -> MiniBatch {
        let take = mini_size.min(self.records.len());
        MiniBatch {
            sentences: self.records.drain(..take).collect(),
        }
    }
}

/// A bounded slice of a sorted maxi batch.
///
/// Wholly owned by one translation job after dispatch; never shared.
#[derive(Debug)]
pub struct MiniBatch {
    sentences: Vec<Sentence>,
}

impl MiniBatch {
    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Whether the batch holds no sentences — the exhaustion signal.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Longest sentence in the batch, in tokens.
    pub fn max_len(&self) -> usize {
        self.sentences.iter().map(Sentence::len).max().unwrap_or(0)
    }

    /// Iterate the sentences in order.
    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences.iter()
    }

    /// Consume the batch, yielding its sentences.
    pub fn into_sentences(self) -> Vec<Sentence> {
        self.sentences
    }
}
