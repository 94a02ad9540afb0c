//! Single-owner device memory regions.
//!
//! A [`DeviceBuffer`] owns one raw device-resident region of a scalar
//! element type. Ownership is move-only; duplication is explicit and
//! goes through an asynchronous device-to-device copy on a stream
//! token. The region is released exactly once, on drop, returning its
//! bytes to the shared [`DeviceContext`] accounting.
//!
//! In the default (non-`cuda`) build the region lives in host memory
//! but keeps device semantics: byte-addressed, never implicitly
//! zeroed, reachable only through stream transfers.

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use tracing::debug;

use crate::gpu::device::DeviceContext;
use crate::gpu::stream::StreamToken;

/// Element types storable in device memory.
pub trait Scalar: Pod + Send + Sync + 'static {}

impl<T: Pod + Send + Sync + 'static> Scalar for T {}

/// A raw device memory region holding up to `capacity` elements of `T`.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    /// Stable identity for diagnostics and capacity tracking.
    id: u64,

    /// Reserved elements. May exceed the owner's logical size.
    capacity: usize,

    /// Backing region. Contents beyond what was explicitly written are
    /// unspecified, as on a real device.
    region: Box<[u8]>,

    ctx: Arc<DeviceContext>,

    _elem: PhantomData<T>,
}

impl<T: Scalar> DeviceBuffer<T> {
    /// Allocate a region for `capacity` elements.
    ///
    /// The contents are uninitialized. Exhausting the device budget is
    /// fatal and terminates the process (see [`DeviceContext::reserve`]).
    pub fn alloc(ctx: &Arc<DeviceContext>, capacity: usize) -> Self {
        let bytes = capacity * std::mem::size_of::<T>();
        ctx.reserve(bytes);
        Self {
            id: ctx.next_buffer_id(),
            capacity,
            region: vec![0u8; bytes].into_boxed_slice(),
            ctx: ctx.clone(),
            _elem: PhantomData,
        }
    }

    /// Deep-copy this buffer on `stream`.
    ///
    /// The result has the same capacity and shares nothing with the
    /// source; the transfer is ordered on the given stream token.
    pub fn duplicate(&self, stream: &StreamToken) -> Self {
        let mut copy = Self::alloc(&self.ctx, self.capacity);
        stream.copy_device(self, &mut copy, self.capacity);
        copy
    }

    /// Buffer identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Reserved elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.region
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.region
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.ctx.release(self.region.len());
        debug!(buffer = self.id, bytes = self.region.len(), "Freed device buffer");
    }
}
