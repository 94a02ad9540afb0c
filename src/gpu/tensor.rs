//! Growable 4-axis tensors over device buffers.
//!
//! A [`Tensor`] is a logical {rows, cols, beam, batch} view over one
//! [`DeviceBuffer`]. The logical size (the product of the four axes)
//! never exceeds the buffer capacity, and capacity never shrinks for a
//! given buffer identity until an explicit [`Tensor::clear`].
//!
//! Growth is manual and preserves data: resizing past capacity
//! allocates a new buffer, copies forward exactly the previous logical
//! size, and frees the old region. Shrinking within capacity only
//! relabels the axes — the region beyond the new logical size is left
//! untouched, and re-growing within capacity exposes it again without
//! zeroing. Consumers that assume zero-initialized growth are wrong;
//! pass `zero_fill` at construction if that is what they need.

use std::sync::Arc;

use thiserror::Error;

use crate::gpu::buffer::{DeviceBuffer, Scalar};
use crate::gpu::device::DeviceContext;
use crate::gpu::stream::StreamToken;

/// The standard floating-point tensor.
pub type Matrix = Tensor<f32>;

/// Integer tensor, used for token id planes.
pub type IntMatrix = Tensor<u32>;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("Reshape to {requested} elements exceeds buffer capacity {capacity}")]
    ReshapeExceedsCapacity { requested: usize, capacity: usize },
}

/// A 4-axis logical view over a single-owner device buffer.
pub struct Tensor<T: Scalar> {
    /// Axis extents: rows, cols, beam, batch.
    dims: [usize; 4],

    /// Backing region; `None` when the tensor is empty.
    buf: Option<DeviceBuffer<T>>,

    ctx: Arc<DeviceContext>,

    /// Ordering token for every transfer this tensor issues.
    stream: StreamToken,
}

impl<T: Scalar> Tensor<T> {
    /// Create an empty tensor: zero on every axis, no allocation.
    pub fn empty(ctx: Arc<DeviceContext>, stream: StreamToken) -> Self {
        Self {
            dims: [0; 4],
            buf: None,
            ctx,
            stream,
        }
    }

    /// Create a tensor with capacity equal to its logical size.
    ///
    /// With `zero_fill` the region is zeroed on the stream; otherwise
    /// its contents are unspecified.
    pub fn with_dims(
        ctx: Arc<DeviceContext>,
        stream: StreamToken,
        rows: usize,
        cols: usize,
        beam: usize,
        batch: usize,
        zero_fill: bool,
    ) -> Self {
        let size = rows * cols * beam * batch;
        let mut buf = DeviceBuffer::alloc(&ctx, size);
        if zero_fill {
            stream.fill_zero(&mut buf, size);
        }
        Self {
            dims: [rows, cols, beam, batch],
            buf: Some(buf),
            ctx,
            stream,
        }
    }

    /// Deep-copy this tensor on its stream.
    ///
    /// Copies the full capacity, not just the logical range, so the
    /// result matches the source buffer exactly and aliases nothing.
    pub fn duplicate(&self) -> Self {
        Self {
            dims: self.dims,
            buf: self.buf.as_ref().map(|b| b.duplicate(&self.stream)),
            ctx: self.ctx.clone(),
            stream: self.stream.clone(),
        }
    }

    /// Set the axes to the requested extents, growing the buffer if
    /// needed.
    ///
    /// Branches, in order:
    /// 1. no buffer yet — allocate exactly the requested logical size;
    /// 2. requested size exceeds capacity — allocate a new buffer, copy
    ///    forward the previous logical size, free the old region;
    /// 3. requested size is zero — full clear of the buffer;
    /// 4. otherwise — relabel the axes only. No data movement, and the
    ///    newly exposed region is not zeroed.
    pub fn resize(&mut self, rows: usize, cols: usize, beam: usize, batch: usize) {
        let requested = rows * cols * beam * batch;
        let prev_size = self.logical_size();

        match self.buf.take() {
            None => {
                if requested > 0 {
                    self.buf = Some(DeviceBuffer::alloc(&self.ctx, requested));
                }
            }
            Some(old) => {
                if requested > old.capacity() {
                    let mut grown = DeviceBuffer::alloc(&self.ctx, requested);
                    self.stream.copy_device(&old, &mut grown, prev_size);
                    self.buf = Some(grown);
                } else if requested == 0 {
                    // Buffer released; axes still take the requested values.
                } else {
                    self.buf = Some(old);
                }
            }
        }

        self.dims = [rows, cols, beam, batch];
    }

    /// Relabel the axes without touching the buffer.
    ///
    /// Fails if the requested logical size exceeds the current
    /// capacity; on failure nothing is mutated. Callers treat the error
    /// as a usage violation, not an input condition.
    pub fn reshape(
        &mut self,
        rows: usize,
        cols: usize,
        beam: usize,
        batch: usize,
    ) -> Result<(), TensorError> {
        let requested = rows * cols * beam * batch;
        if requested > self.capacity() {
            return Err(TensorError::ReshapeExceedsCapacity {
                requested,
                capacity: self.capacity(),
            });
        }
        self.dims = [rows, cols, beam, batch];
        Ok(())
    }

    /// Merge the beam and batch axes into rows.
    ///
    /// Pure relabeling: rows becomes rows·beam·batch, beam and batch
    /// become 1. No data moves.
    pub fn collapse_axes(&mut self) {
        self.dims[0] *= self.dims[2] * self.dims[3];
        self.dims[2] = 1;
        self.dims[3] = 1;
    }

    /// Release the buffer and zero every axis. Idempotent.
    pub fn clear(&mut self) {
        self.buf = None;
        self.dims = [0; 4];
    }

    /// Extent of `axis` (0 = rows, 1 = cols, 2 = beam, 3 = batch).
    ///
    /// Panics on an out-of-range axis: that is a programmer error, not
    /// a runtime condition.
    pub fn dim(&self, axis: usize) -> usize {
        match axis {
            0..=3 => self.dims[axis],
            _ => panic!("tensor axis out of range: {axis}"),
        }
    }

    /// rows · cols · beam · batch.
    pub fn logical_size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Whether the logical size is zero.
    pub fn is_empty(&self) -> bool {
        self.logical_size() == 0
    }

    /// Reserved elements in the backing buffer, 0 when empty.
    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map_or(0, DeviceBuffer::capacity)
    }

    /// Identity of the backing buffer, if any.
    pub fn buffer_id(&self) -> Option<u64> {
        self.buf.as_ref().map(DeviceBuffer::id)
    }

    /// The stream token ordering this tensor's transfers.
    pub fn stream(&self) -> &StreamToken {
        &self.stream
    }

    /// Copy `host` into the logical range. Lengths must match.
    pub fn upload(&mut self, host: &[T]) {
        assert_eq!(host.len(), self.logical_size());
        if let Some(buf) = &mut self.buf {
            self.stream.copy_from_host(host, buf);
        }
    }

    /// Copy the logical range back to the host. Blocking.
    pub fn download(&self) -> Vec<T> {
        let mut host = vec![T::zeroed(); self.logical_size()];
        if let Some(buf) = &self.buf {
            self.stream.copy_to_host(buf, &mut host);
        }
        host
    }

    /// Render dimensions, buffer identity, and capacity.
    ///
    /// With `detailed`, additionally runs a blocking device-side sum
    /// reduction over the logical range. Debug only — it synchronizes
    /// the stream.
    pub fn describe(&self, detailed: bool) -> String
    where
        f64: From<T>,
    {
        let ident = self
            .buffer_id()
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let mut out = format!(
            "{}x{}x{}x{} buf={} cap={}",
            self.dims[0],
            self.dims[1],
            self.dims[2],
            self.dims[3],
            ident,
            self.capacity(),
        );
        if detailed {
            let sum = self
                .buf
                .as_ref()
                .map_or(0.0, |b| self.stream.reduce_sum(b, self.logical_size()));
            out.push_str(&format!(" size={} sum={sum}", self.logical_size()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Arc<DeviceContext> {
        Arc::new(DeviceContext::new(1024 * 1024))
    }

    fn filled(ctx: &Arc<DeviceContext>, values: &[f32]) -> Matrix {
        let mut t = Matrix::with_dims(
            ctx.clone(),
            StreamToken::new(),
            values.len(),
            1,
            1,
            1,
            false,
        );
        t.upload(values);
        t
    }

    #[test]
    fn test_empty_tensor_has_no_buffer() {
        let t = Matrix::empty(ctx(), StreamToken::new());
        assert_eq!(t.logical_size(), 0);
        assert_eq!(t.capacity(), 0);
        assert!(t.buffer_id().is_none());
        assert!(t.is_empty());
    }

    #[test]
    fn test_zero_fill_construction() {
        let t = Matrix::with_dims(ctx(), StreamToken::new(), 2, 3, 1, 1, true);
        assert_eq!(t.download(), vec![0.0; 6]);
    }

    #[test]
    fn test_resize_scenario_from_empty() {
        let mut t = Matrix::empty(ctx(), StreamToken::new());

        t.resize(2, 3, 1, 1);
        assert_eq!(t.capacity(), 6);
        assert_eq!(t.logical_size(), 6);
        let first_id = t.buffer_id();

        // Shrinking within capacity relabels only.
        t.resize(2, 2, 1, 1);
        assert_eq!(t.logical_size(), 4);
        assert_eq!(t.capacity(), 6);
        assert_eq!(t.buffer_id(), first_id);

        // Growing past capacity reallocates.
        t.resize(4, 4, 1, 1);
        assert_eq!(t.logical_size(), 16);
        assert!(t.capacity() >= 16);
        assert_ne!(t.buffer_id(), first_id);
    }

    #[test]
    fn test_growth_preserves_previous_logical_size() {
        let ctx = ctx();
        let mut t = filled(&ctx, &[1.0, 2.0, 3.0, 4.0]);

        // Shrink to 2 elements, then grow past capacity: only the
        // previous logical size (2) is guaranteed to carry over.
        t.resize(2, 1, 1, 1);
        t.resize(8, 1, 1, 1);
        let back = t.download();
        assert_eq!(&back[..2], &[1.0, 2.0]);
    }

    #[test]
    fn test_resize_with_zero_axis_clears_buffer() {
        let mut t = Matrix::with_dims(ctx(), StreamToken::new(), 4, 4, 1, 1, false);
        t.resize(0, 5, 1, 1);
        assert_eq!(t.capacity(), 0);
        assert!(t.buffer_id().is_none());
        assert_eq!(t.dim(0), 0);
        assert_eq!(t.dim(1), 5);
        assert!(t.is_empty());
    }

    #[test]
    fn test_reshape_rejection_leaves_state_unchanged() {
        let mut t = Matrix::with_dims(ctx(), StreamToken::new(), 2, 3, 1, 1, false);
        let err = t.reshape(4, 4, 1, 1).unwrap_err();
        match err {
            TensorError::ReshapeExceedsCapacity {
                requested,
                capacity,
            } => {
                assert_eq!(requested, 16);
                assert_eq!(capacity, 6);
            }
        }
        assert_eq!(t.dim(0), 2);
        assert_eq!(t.dim(1), 3);
        assert_eq!(t.capacity(), 6);
    }

    #[test]
    fn test_collapse_axes_roundtrip_keeps_content() {
        let ctx = ctx();
        let mut t = Matrix::with_dims(ctx.clone(), StreamToken::new(), 2, 3, 2, 2, false);
        let values: Vec<f32> = (0..24).map(|i| i as f32).collect();
        t.upload(&values);

        t.collapse_axes();
        assert_eq!(t.dim(0), 8);
        assert_eq!(t.dim(2), 1);
        assert_eq!(t.dim(3), 1);

        t.reshape(2, 3, 2, 2).unwrap();
        assert_eq!(t.download(), values);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut t = Matrix::with_dims(ctx(), StreamToken::new(), 3, 3, 1, 1, false);
        t.clear();
        t.clear();
        for axis in 0..4 {
            assert_eq!(t.dim(axis), 0);
        }
        assert_eq!(t.capacity(), 0);
    }

    #[test]
    fn test_capacity_monotone_until_clear() {
        let mut t = Matrix::empty(ctx(), StreamToken::new());
        let mut last_cap = 0;
        for (r, c) in [(2, 3), (1, 2), (4, 4), (2, 2), (5, 5)] {
            t.resize(r, c, 1, 1);
            assert!(t.logical_size() <= t.capacity());
            assert!(t.capacity() >= last_cap);
            last_cap = t.capacity();
        }
        t.clear();
        assert_eq!(t.capacity(), 0);
    }

    #[test]
    fn test_duplicate_shares_nothing() {
        let ctx = ctx();
        let mut t = filled(&ctx, &[5.0, 6.0]);
        let copy = t.duplicate();
        assert_ne!(copy.buffer_id(), t.buffer_id());

        t.upload(&[0.0, 0.0]);
        assert_eq!(copy.download(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_describe_reports_identity_and_sum() {
        let ctx = ctx();
        let t = filled(&ctx, &[1.0, 2.0, 3.0]);
        let brief = t.describe(false);
        assert!(brief.starts_with("3x1x1x1"));
        assert!(!brief.contains("sum="));

        let detailed = t.describe(true);
        assert!(detailed.contains("size=3"));
        assert!(detailed.contains("sum=6"));
    }

    #[test]
    #[should_panic(expected = "axis out of range")]
    fn test_dim_out_of_range_panics() {
        let t = Matrix::empty(ctx(), StreamToken::new());
        let _ = t.dim(4);
    }
}
