//! Kernel boot configuration
//!
//! Partition count and size, the disk geometry and the initial quantum are
//! fixed at boot. The quantum can be changed afterwards through the kernel
//! API; nothing else can.

use hal::DiskGeometry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest partition a 16-bit program counter can address
pub const MAX_PARTITION_SIZE: usize = 1 << 16;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("partition count must be positive")]
    NoPartitions,

    #[error("quantum must be a positive number of ticks")]
    ZeroQuantum,

    #[error("{memory_size} bytes of memory cannot be split into {partition_count} equal partitions")]
    UnevenPartitions {
        memory_size: usize,
        partition_count: usize,
    },

    #[error("partition size {0} is outside 1..={max}", max = MAX_PARTITION_SIZE)]
    PartitionSize(usize),
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Total main memory in bytes
    pub memory_size: usize,
    /// Number of equal, fixed partitions
    pub partition_count: usize,
    /// Ticks a process runs before preemption
    pub quantum: u32,
    /// Priority given to programs loaded without one
    pub default_priority: u8,
    /// Entries kept in the kernel trace log
    pub log_capacity: usize,
    /// Disk drive layout
    pub geometry: DiskGeometry,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            memory_size: 768,
            partition_count: 3,
            quantum: 6,
            default_priority: 5,
            log_capacity: 1024,
            geometry: DiskGeometry::standard(),
        }
    }
}

impl KernelConfig {
    /// Bytes per partition
    pub fn partition_size(&self) -> usize {
        self.memory_size.checked_div(self.partition_count).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_count == 0 {
            return Err(ConfigError::NoPartitions);
        }
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.memory_size % self.partition_count != 0 {
            return Err(ConfigError::UnevenPartitions {
                memory_size: self.memory_size,
                partition_count: self.partition_count,
            });
        }
        let size = self.partition_size();
        if size == 0 || size > MAX_PARTITION_SIZE {
            return Err(ConfigError::PartitionSize(size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert_eq!(config.partition_size(), 256);
        assert_eq!(config.geometry.block_count(), 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = KernelConfig {
            partition_count: 0,
            ..KernelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPartitions));

        config.partition_count = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnevenPartitions { .. })
        ));

        config.partition_count = 3;
        config.quantum = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroQuantum));

        let huge = KernelConfig {
            memory_size: 3 * (MAX_PARTITION_SIZE + 1),
            ..KernelConfig::default()
        };
        assert_eq!(
            huge.validate(),
            Err(ConfigError::PartitionSize(MAX_PARTITION_SIZE + 1))
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: KernelConfig = serde_json::from_str(r#"{"quantum": 2}"#).unwrap();
        assert_eq!(config.quantum, 2);
        assert_eq!(config.partition_count, 3);
        assert_eq!(config.memory_size, 768);
    }
}
