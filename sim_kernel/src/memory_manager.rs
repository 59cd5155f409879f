//! Fixed-partition memory manager
//!
//! Memory is divided at boot into equal partitions that never move, split or
//! merge. A partition has at most one owner. Allocation is first-fit by
//! partition index.

use crate::memory::{Bounds, Memory, MemoryError};
use core_types::ProcessId;
use thiserror::Error;

/// Allocation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("no partition {0}")]
    InvalidPartition(usize),

    #[error("partition {0} is already in use")]
    PartitionInUse(usize),

    #[error("no partition spans {base:#06x}..{limit:#06x}")]
    UnknownRange { base: usize, limit: usize },

    #[error("image of {size} bytes exceeds partition size {capacity}")]
    ImageTooLarge { size: usize, capacity: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// A fixed memory partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub base: usize,
    pub limit: usize,
    pub active: bool,
    pub owner: Option<ProcessId>,
}

impl Partition {
    pub fn size(&self) -> usize {
        self.limit - self.base
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.base, self.limit)
    }
}

/// Memory manager
#[derive(Debug, Clone)]
pub struct MemoryManager {
    memory: Memory,
    partitions: Vec<Partition>,
}

impl MemoryManager {
    /// Splits `memory_size` bytes into `partition_count` equal partitions
    ///
    /// Any remainder after the last partition is never handed out.
    pub fn new(memory_size: usize, partition_count: usize) -> Self {
        let size = memory_size.checked_div(partition_count).unwrap_or(0);
        let partitions = (0..partition_count)
            .map(|index| Partition {
                index,
                base: index * size,
                limit: (index + 1) * size,
                active: false,
                owner: None,
            })
            .collect();

        Self {
            memory: Memory::new(memory_size),
            partitions,
        }
    }

    /// Lowest-index inactive partition
    pub fn find_free_partition(&self) -> Option<usize> {
        self.partitions.iter().position(|p| !p.active)
    }

    /// Loads an image into a free partition
    ///
    /// The partition is zeroed before the image is written, so whatever the
    /// image does not cover reads back as zero.
    pub fn allocate(
        &mut self,
        index: usize,
        owner: ProcessId,
        image: &[u8],
    ) -> Result<&Partition, AllocationError> {
        let partition = self
            .partitions
            .get(index)
            .ok_or(AllocationError::InvalidPartition(index))?;
        if partition.active {
            return Err(AllocationError::PartitionInUse(index));
        }
        if image.len() > partition.size() {
            return Err(AllocationError::ImageTooLarge {
                size: image.len(),
                capacity: partition.size(),
            });
        }

        let bounds = partition.bounds();
        self.memory.zero_range(bounds)?;
        self.memory.write_range(bounds, image)?;

        let partition = &mut self.partitions[index];
        partition.active = true;
        partition.owner = Some(owner);
        Ok(partition)
    }

    /// Releases the partition spanning `[base, limit)`
    ///
    /// The range is zeroed. Freeing an inactive partition is a no-op.
    pub fn free(&mut self, base: usize, limit: usize) -> Result<(), AllocationError> {
        let index = self
            .partitions
            .iter()
            .position(|p| p.base == base && p.limit == limit)
            .ok_or(AllocationError::UnknownRange { base, limit })?;

        if !self.partitions[index].active {
            return Ok(());
        }

        self.memory.zero_range(Bounds::new(base, limit))?;
        let partition = &mut self.partitions[index];
        partition.active = false;
        partition.owner = None;
        Ok(())
    }

    /// Copies out the full contents of a partition
    pub fn read_partition(&self, index: usize) -> Result<Vec<u8>, AllocationError> {
        let partition = self
            .partitions
            .get(index)
            .ok_or(AllocationError::InvalidPartition(index))?;
        Ok(self.memory.read_range(partition.bounds())?.to_vec())
    }

    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Number of partitions currently owned
    pub fn active_count(&self) -> usize {
        self.partitions.iter().filter(|p| p.active).count()
    }

    /// Bytes per partition
    pub fn partition_size(&self) -> usize {
        self.partitions.first().map(Partition::size).unwrap_or(0)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
}
