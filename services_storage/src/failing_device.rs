//! # Failing Disk
//!
//! A DiskDevice wrapper that can simulate write failures, for exercising
//! error paths in the file system and the kernel's swap handling.

use core_types::Tsb;
use hal::{DiskDevice, DiskError, DiskGeometry};

/// Policy for when failures should occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Fail every write after N successful writes
    AfterWrites(usize),
    /// Fail writes to specific blocks
    OnBlocks(Vec<Tsb>),
    /// Fail writes anywhere on the given tracks
    OnTracks(Vec<u8>),
}

/// Wrapper around a DiskDevice that can simulate failures
#[derive(Debug, Clone)]
pub struct FailingDisk<D: DiskDevice> {
    inner: D,
    policy: FailurePolicy,
    write_count: usize,
}

impl<D: DiskDevice> FailingDisk<D> {
    pub fn new(inner: D, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy,
            write_count: 0,
        }
    }

    fn should_fail(&self, tsb: Tsb) -> bool {
        match &self.policy {
            FailurePolicy::Never => false,
            FailurePolicy::AfterWrites(n) => self.write_count >= *n,
            FailurePolicy::OnBlocks(blocks) => blocks.contains(&tsb),
            FailurePolicy::OnTracks(tracks) => tracks.contains(&tsb.track),
        }
    }

    /// Get the underlying device (for inspection)
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Number of writes that reached the underlying device
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Replaces the failure policy and resets the write counter
    pub fn set_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
        self.write_count = 0;
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DiskDevice> DiskDevice for FailingDisk<D> {
    fn geometry(&self) -> DiskGeometry {
        self.inner.geometry()
    }

    fn read_block(&mut self, tsb: Tsb, buffer: &mut [u8]) -> Result<(), DiskError> {
        self.inner.read_block(tsb, buffer)
    }

    fn write_block(&mut self, tsb: Tsb, buffer: &[u8]) -> Result<(), DiskError> {
        if self.should_fail(tsb) {
            return Err(DiskError::IoError);
        }
        self.write_count += 1;
        self.inner.write_block(tsb, buffer)
    }

    fn flush(&mut self) -> Result<(), DiskError> {
        self.inner.flush()
    }
}
