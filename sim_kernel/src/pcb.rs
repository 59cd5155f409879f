//! Process control blocks

use crate::memory::Bounds;
use crate::memory_manager::Partition;
use core_types::ProcessId;
use kernel_api::{ExitReason, Location, ProcessSnapshot, ProcessState, Registers};
use services_storage::SWAP_PREFIX;

/// Name of the swap file holding a rolled-out process
pub fn swap_file_name(pid: ProcessId) -> String {
    format!("{}{}", SWAP_PREFIX, pid)
}

/// Everything the kernel knows about one process
///
/// Registers are only a saved snapshot; the live values are in the CPU while
/// the process is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub pid: ProcessId,
    pub priority: u8,
    pub state: ProcessState,
    pub location: Location,
    pub partition: Option<usize>,
    pub bounds: Option<Bounds>,
    pub registers: Registers,
    /// Program image as loaded
    pub image: Vec<u8>,
    /// Clock tick at admission
    pub admitted_at: u64,
    /// Clock tick at termination
    pub completed_at: Option<u64>,
    /// Ticks spent waiting in the ready queue
    pub ready_wait: u64,
    /// Instructions executed
    pub executed_ticks: u64,
    pub exit_reason: Option<ExitReason>,
}

impl ProcessControlBlock {
    /// Creates a resident process with zeroed registers
    pub fn new(pid: ProcessId, priority: u8, image: Vec<u8>, admitted_at: u64) -> Self {
        Self {
            pid,
            priority,
            state: ProcessState::Resident,
            location: Location::Memory,
            partition: None,
            bounds: None,
            registers: Registers::default(),
            image,
            admitted_at,
            completed_at: None,
            ready_wait: 0,
            executed_ticks: 0,
            exit_reason: None,
        }
    }

    /// Records that the process now owns `partition`
    pub fn place_in_memory(&mut self, partition: &Partition) {
        self.location = Location::Memory;
        self.partition = Some(partition.index);
        self.bounds = Some(partition.bounds());
    }

    /// Records that the process image now lives in its swap file
    pub fn place_on_disk(&mut self) {
        self.location = Location::Disk;
        self.partition = None;
        self.bounds = None;
    }

    pub fn swap_file_name(&self) -> String {
        swap_file_name(self.pid)
    }

    /// True until the process terminates
    pub fn is_live(&self) -> bool {
        !self.state.is_terminal()
    }

    /// True if the process holds a partition
    pub fn is_memory_resident(&self) -> bool {
        self.is_live() && self.location == Location::Memory && self.partition.is_some()
    }

    /// Ticks from admission to termination
    pub fn turnaround(&self) -> Option<u64> {
        self.completed_at
            .map(|done| done.saturating_sub(self.admitted_at))
    }

    /// Marks the process terminated at `tick`
    pub fn finish(&mut self, reason: ExitReason, tick: u64) {
        self.state = ProcessState::Terminated;
        self.partition = None;
        self.bounds = None;
        self.completed_at = Some(tick);
        self.exit_reason = Some(reason);
    }

    /// Builds the listing entry for this process
    pub fn snapshot(&self, live_registers: Option<Registers>) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: self.pid,
            priority: self.priority,
            state: self.state,
            location: self.location,
            partition: self.partition,
            saved_registers: self.registers,
            live_registers,
            executed_ticks: self.executed_ticks,
            ready_wait: self.ready_wait,
            turnaround: self.turnaround(),
            exit_reason: self.exit_reason.clone(),
        }
    }
}
