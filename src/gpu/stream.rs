//! Execution stream tokens for ordering device operations.
//!
//! Every transfer is issued on a [`StreamToken`]. Operations on one
//! token complete in issue order relative to one another, so a job that
//! issues copies on its own token observes a consistent happens-before
//! relation without a full device synchronization after each call.
//! Tokens from different jobs carry no relative ordering guarantee.
//!
//! Without the `cuda` feature, transfers run eagerly against the host
//! backing store; the token still records issue order so ordering
//! assumptions stay testable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::gpu::buffer::{DeviceBuffer, Scalar};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);

/// A cheaply clonable handle to one execution stream.
///
/// Clones share the same stream: copies issued through any clone are
/// ordered with respect to each other.
#[derive(Debug, Clone)]
pub struct StreamToken {
    inner: Arc<StreamInner>,
}

#[derive(Debug)]
struct StreamInner {
    id: u64,
    ops_issued: AtomicU64,
}

impl Default for StreamToken {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamToken {
    /// Open a new stream.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
                ops_issued: AtomicU64::new(0),
            }),
        }
    }

    /// Stream identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Number of operations issued on this stream so far.
    pub fn ops_issued(&self) -> u64 {
        self.inner.ops_issued.load(Ordering::Relaxed)
    }

    fn record_op(&self, kind: &str, elems: usize) {
        let seq = self.inner.ops_issued.fetch_add(1, Ordering::Relaxed);
        trace!(stream = self.inner.id, seq, kind, elems, "Stream op");
    }

    /// Asynchronous device-to-device copy of the first `elems` elements.
    ///
    /// Both buffers must have capacity for `elems`; violating that is a
    /// programmer error.
    pub fn copy_device<T: Scalar>(
        &self,
        src: &DeviceBuffer<T>,
        dst: &mut DeviceBuffer<T>,
        elems: usize,
    ) {
        assert!(elems <= src.capacity() && elems <= dst.capacity());
        let bytes = elems * std::mem::size_of::<T>();
        dst.bytes_mut()[..bytes].copy_from_slice(&src.bytes()[..bytes]);
        self.record_op("d2d", elems);
    }

    /// Asynchronous host-to-device copy of all of `src`.
    pub fn copy_from_host<T: Scalar>(&self, src: &[T], dst: &mut DeviceBuffer<T>) {
        assert!(src.len() <= dst.capacity());
        let bytes = std::mem::size_of_val(src);
        dst.bytes_mut()[..bytes].copy_from_slice(bytemuck::cast_slice(src));
        self.record_op("h2d", src.len());
    }

    /// Blocking device-to-host copy filling all of `dst`.
    pub fn copy_to_host<T: Scalar>(&self, src: &DeviceBuffer<T>, dst: &mut [T]) {
        assert!(dst.len() <= src.capacity());
        let bytes = std::mem::size_of_val(dst);
        bytemuck::cast_slice_mut(dst).copy_from_slice(&src.bytes()[..bytes]);
        self.record_op("d2h", dst.len());
        self.synchronize();
    }

    /// Zero the first `elems` elements of `buf`.
    pub fn fill_zero<T: Scalar>(&self, buf: &mut DeviceBuffer<T>, elems: usize) {
        assert!(elems <= buf.capacity());
        let bytes = elems * std::mem::size_of::<T>();
        buf.bytes_mut()[..bytes].fill(0);
        self.record_op("memset", elems);
    }

    /// Device-side sum reduction over the first `elems` elements,
    /// copied back as one scalar.
    ///
    /// Blocking and expensive; intended for diagnostics only.
    pub fn reduce_sum<T>(&self, buf: &DeviceBuffer<T>, elems: usize) -> f64
    where
        T: Scalar,
        f64: From<T>,
    {
        assert!(elems <= buf.capacity());
        let slice: &[T] = bytemuck::cast_slice(&buf.bytes()[..elems * std::mem::size_of::<T>()]);
        let sum = slice.iter().map(|&v| f64::from(v)).sum();
        self.record_op("reduce", elems);
        self.synchronize();
        sum
    }

    /// Wait for every operation issued on this stream to complete.
    ///
    /// A no-op in the host simulation, where transfers run eagerly.
    pub fn synchronize(&self) {
        trace!(stream = self.inner.id, "Stream synchronize");
    }
}
