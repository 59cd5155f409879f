//! Kernel API trait and admission/tick result types

use crate::{ExitReason, KernelError, Location, ProcessSnapshot};
use core_types::ProcessId;
use serde::{Deserialize, Serialize};

/// Result of a successful program load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReceipt {
    pub pid: ProcessId,
    pub location: Location,
    /// Partition index when loaded into memory
    pub partition: Option<usize>,
}

/// What happened during one clock tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// No process is executing
    Idle,
    /// One instruction ran; the process keeps the CPU
    Executed(ProcessId),
    /// One instruction ran and the quantum expired
    Preempted(ProcessId),
    /// One instruction ran and the process terminated
    Exited { pid: ProcessId, reason: ExitReason },
}

/// The kernel API trait
///
/// This is the whole surface the host layer sees. A shell command maps to
/// one call; the hardware harness calls [`KernelApi::clock_tick`] once per
/// clock pulse.
///
/// # Design Principles
///
/// **Validation before mutation**: a call that returns a validation or
/// resource error has changed nothing.
///
/// **Single driver**: nothing happens between calls. There are no threads
/// and no callbacks.
///
/// # Example
///
/// ```ignore
/// let receipt = kernel.load(&[0xA9, 0x01, 0x00])?;
/// kernel.run(receipt.pid)?;
/// while kernel.is_executing() {
///     kernel.clock_tick()?;
/// }
/// ```
pub trait KernelApi {
    /// Admits a program image with the default priority
    fn load(&mut self, image: &[u8]) -> Result<LoadReceipt, KernelError>;

    /// Admits a program image with an explicit priority
    fn load_with_priority(
        &mut self,
        image: &[u8],
        priority: u8,
    ) -> Result<LoadReceipt, KernelError>;

    /// Moves one resident process to the ready queue and starts the CPU
    fn run(&mut self, pid: ProcessId) -> Result<(), KernelError>;

    /// Moves every resident process to the ready queue, in pid order
    ///
    /// Returns the pids that were scheduled.
    fn run_all(&mut self) -> Vec<ProcessId>;

    /// Returns a snapshot of every process ever loaded, in pid order
    fn processes(&self) -> Vec<ProcessSnapshot>;

    /// Terminates one process
    fn kill(&mut self, pid: ProcessId) -> Result<(), KernelError>;

    /// Terminates every live process and halts the CPU
    ///
    /// Returns the pids that were terminated.
    fn kill_all(&mut self) -> Vec<ProcessId>;

    /// Replaces the round-robin quantum
    fn set_quantum(&mut self, quantum: u32) -> Result<(), KernelError>;

    /// Returns the round-robin quantum in ticks
    fn quantum(&self) -> u32;

    /// Returns true while the CPU has work
    fn is_executing(&self) -> bool;

    /// Advances the machine by one instruction
    fn clock_tick(&mut self) -> Result<TickOutcome, KernelError>;

    /// Formats the disk, destroying every file
    fn format_disk(&mut self) -> Result<(), KernelError>;

    /// Creates an empty file
    fn create_file(&mut self, name: &str) -> Result<(), KernelError>;

    /// Reads a whole file
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, KernelError>;

    /// Replaces the contents of a file
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), KernelError>;

    /// Deletes a file and frees its blocks
    fn delete_file(&mut self, name: &str) -> Result<(), KernelError>;

    /// Copies a file to a new name
    fn copy_file(&mut self, from: &str, to: &str) -> Result<(), KernelError>;

    /// Renames a file in place
    fn rename_file(&mut self, from: &str, to: &str) -> Result<(), KernelError>;

    /// Lists user-visible files in directory order
    fn list_files(&mut self) -> Result<Vec<String>, KernelError>;
}
