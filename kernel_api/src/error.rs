//! Kernel error types

use crate::ProcessState;
use core_types::ProcessId;
use thiserror::Error;

/// Broad classes of kernel failure
///
/// Validation and resource errors leave the kernel unchanged and are safe to
/// report to the operator. Internal errors mean an invariant was broken; the
/// kernel halts the CPU rather than continue on corrupted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ResourceExhausted,
    Internal,
}

/// Errors that can occur when interacting with the kernel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Program image is empty or malformed
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// Program image does not fit in a partition
    #[error("Program of {size} bytes exceeds partition size of {capacity} bytes")]
    ProgramTooLarge { size: usize, capacity: usize },

    /// File name is empty, too long, or contains a NUL byte
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// File name is reserved for swap files
    #[error("File name is reserved: {0:?}")]
    ReservedFileName(String),

    /// Disk operation attempted before format
    #[error("Disk is not formatted")]
    DiskNotFormatted,

    /// Quantum must be a positive number of ticks
    #[error("Invalid quantum: {0}")]
    InvalidQuantum(u32),

    /// No process with this ID was ever loaded
    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),

    /// Process cannot be scheduled from its current state
    #[error("Process {pid} is {state}, not resident")]
    ProcessNotResident { pid: ProcessId, state: ProcessState },

    /// Process has already terminated
    #[error("Process {0} is already terminated")]
    AlreadyTerminated(ProcessId),

    /// File does not exist
    #[error("File not found: {0:?}")]
    FileNotFound(String),

    /// File already exists
    #[error("File already exists: {0:?}")]
    FileExists(String),

    /// Operation is not allowed while the CPU is executing
    #[error("Cannot {0} while the CPU is executing")]
    CpuBusy(String),

    /// Disk cannot be formatted while processes are swapped out to it
    #[error("Disk holds swapped-out processes")]
    SwapInUse,

    /// Every process identifier has been handed out
    #[error("Process identifiers exhausted")]
    PidsExhausted,

    /// No free partition and no formatted disk to swap to
    #[error("No free memory partition and disk is not formatted")]
    OutOfMemory,

    /// No free directory entry
    #[error("Directory is full")]
    DirectoryFull,

    /// Not enough free data blocks
    #[error("Disk is full: {needed} blocks needed, {available} available")]
    DiskFull { needed: usize, available: usize },

    /// Kernel invariant violated
    #[error("Internal kernel error: {0}")]
    Internal(String),
}

impl KernelError {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::OutOfMemory
            | KernelError::PidsExhausted
            | KernelError::DirectoryFull
            | KernelError::DiskFull { .. } => ErrorKind::ResourceExhausted,
            KernelError::Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }

    /// Returns true for broken-invariant errors
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(KernelError::DiskNotFormatted.kind(), ErrorKind::Validation);
        assert_eq!(KernelError::InvalidQuantum(0).kind(), ErrorKind::Validation);
        assert_eq!(KernelError::OutOfMemory.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(KernelError::PidsExhausted.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(
            KernelError::DiskFull {
                needed: 5,
                available: 1
            }
            .kind(),
            ErrorKind::ResourceExhausted
        );
        assert!(KernelError::Internal("empty ready queue".to_string()).is_internal());
    }

    #[test]
    fn test_error_display() {
        let err = KernelError::ProcessNotResident {
            pid: ProcessId::new(3),
            state: ProcessState::Terminated,
        };
        assert_eq!(err.to_string(), "Process 3 is Terminated, not resident");

        let err = KernelError::CpuBusy("format the disk".to_string());
        assert_eq!(
            err.to_string(),
            "Cannot format the disk while the CPU is executing"
        );
    }
}
