//! Accelerator device context: memory accounting and device discovery.
//!
//! The context is the process-wide allocator facade shared by every
//! tensor. It tracks bytes in use against a configured budget and hands
//! out unique buffer identities. Concurrent translation jobs allocate
//! and free through the same context without extra locking — all
//! accounting is atomic.
//!
//! When compiled without the `cuda` feature, allocations are backed by
//! host memory so the full tensor lifecycle runs in CPU-only tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Out of device memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

/// Information about the accelerator this process runs on.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device name (e.g., "NVIDIA GeForce GTX 1070").
    pub name: String,

    /// Total device memory in bytes.
    pub total_mem: usize,
}

/// Detect the accelerator device.
///
/// With the `cuda` feature enabled, uses the CUDA runtime to query the
/// device. Without it, reports the host-simulated device.
pub fn detect_device() -> DeviceInfo {
    #[cfg(feature = "cuda")]
    {
        detect_device_cuda()
    }

    #[cfg(not(feature = "cuda"))]
    {
        info!("CUDA not enabled, simulating device memory in host RAM");
        DeviceInfo {
            name: "host-simulated".to_string(),
            total_mem: 8 * 1024 * 1024 * 1024,
        }
    }
}

#[cfg(feature = "cuda")]
fn detect_device_cuda() -> DeviceInfo {
    // Real implementation would use cudarc to query the device ordinal
    // selected in config. Compile-time gated until cudarc is wired in.
    todo!("Implement CUDA device detection with cudarc")
}

/// Process-wide device memory accounting.
///
/// Every buffer allocation reserves bytes here and releases them on
/// drop. Exhausting the budget is unrecoverable: the failure is logged
/// with full diagnostic context and the process exits non-zero. Jobs
/// never observe a failed allocation.
#[derive(Debug)]
pub struct DeviceContext {
    /// Device memory budget in bytes.
    budget: usize,

    /// Bytes currently reserved.
    in_use: AtomicUsize,

    /// High-water mark of reserved bytes.
    peak: AtomicUsize,

    /// Next buffer identity.
    next_id: AtomicU64,
}

impl DeviceContext {
    /// Create a context with the given memory budget in bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
        }
    }

    /// Reserve `bytes` against the budget, or report exhaustion.
    pub fn try_reserve(&self, bytes: usize) -> Result<(), DeviceError> {
        let mut current = self.in_use.load(Ordering::Relaxed);
        loop {
            let next = match current.checked_add(bytes) {
                Some(n) if n <= self.budget => n,
                _ => {
                    return Err(DeviceError::OutOfMemory {
                        requested: bytes,
                        available: self.budget.saturating_sub(current),
                    })
                }
            };
            match self.in_use.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::Relaxed);
                    return Ok(());
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Reserve `bytes`, treating exhaustion as fatal.
    ///
    /// Allocation failure is never retried: the policy is to log the
    /// request against current usage and terminate the process.
    pub fn reserve(&self, bytes: usize) {
        if let Err(e) = self.try_reserve(bytes) {
            fatal_allocation(e, self.in_use.load(Ordering::Relaxed), self.budget);
        }
    }

    /// Release previously reserved bytes.
    pub fn release(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }

    /// Allocate a fresh buffer identity.
    pub fn next_buffer_id(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(buffer = id, "New device buffer");
        id
    }

    /// Bytes currently reserved.
    pub fn bytes_in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    /// High-water mark of reserved bytes.
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Configured budget in bytes.
    pub fn budget(&self) -> usize {
        self.budget
    }
}

fn fatal_allocation(err: DeviceError, in_use: usize, budget: usize) -> ! {
    error!(%err, in_use, budget, "Fatal device allocation failure");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_release() {
        let ctx = DeviceContext::new(1024);

        ctx.try_reserve(512).unwrap();
        ctx.try_reserve(512).unwrap();
        assert_eq!(ctx.bytes_in_use(), 1024);

        ctx.release(512);
        assert_eq!(ctx.bytes_in_use(), 512);
        assert_eq!(ctx.peak_bytes(), 1024);
    }

    #[test]
    fn test_over_budget_is_reported() {
        let ctx = DeviceContext::new(100);
        ctx.try_reserve(64).unwrap();

        let err = ctx.try_reserve(64).unwrap_err();
        let DeviceError::OutOfMemory {
            requested,
            available,
        } = err;
        assert_eq!(requested, 64);
        assert_eq!(available, 36);

        // Failed reservation must not change accounting.
        assert_eq!(ctx.bytes_in_use(), 64);
    }

    #[test]
    fn test_buffer_ids_are_unique() {
        let ctx = DeviceContext::new(0);
        let a = ctx.next_buffer_id();
        let b = ctx.next_buffer_id();
        assert_ne!(a, b);
    }
}
