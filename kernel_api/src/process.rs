//! Process state as seen from outside the kernel

use core_types::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process lifecycle state
///
/// The lifecycle is linear: `Resident → Ready → Running → Terminated`.
/// The only backward edge is `Running → Ready` on quantum expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// Loaded, not yet scheduled
    Resident,
    /// Waiting in the ready queue
    Ready,
    /// Owns the CPU's register set
    Running,
    /// Completed, killed, or faulted
    Terminated,
}

impl ProcessState {
    /// Checks if the process is in its final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Terminated)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Resident => "Resident",
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Running",
            ProcessState::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// Where a process image currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Memory,
    Disk,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Memory => f.write_str("Memory"),
            Location::Disk => f.write_str("Disk"),
        }
    }
}

/// CPU register set
///
/// The program counter is relative to the base of the owning partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: u16,
    /// Instruction register (last fetched opcode)
    pub ir: u8,
    /// Accumulator
    pub acc: u8,
    pub x: u8,
    pub y: u8,
    /// Set by compare when the operands are equal
    pub zero_flag: bool,
}

/// Why a process terminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Executed its break instruction
    Completed,
    /// Killed by the operator
    Killed,
    /// Execution fault (bad opcode, bad address, bad system call)
    Faulted { detail: String },
}

impl ExitReason {
    /// Returns true if the process ended abnormally
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ExitReason::Completed)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Completed => f.write_str("completed"),
            ExitReason::Killed => f.write_str("killed"),
            ExitReason::Faulted { detail } => write!(f, "faulted ({})", detail),
        }
    }
}

/// Point-in-time view of one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: ProcessId,
    pub priority: u8,
    pub state: ProcessState,
    pub location: Location,
    /// Partition index while memory resident
    pub partition: Option<usize>,
    /// Registers saved at the last context switch
    pub saved_registers: Registers,
    /// Live CPU registers, present only for the running process
    pub live_registers: Option<Registers>,
    /// Instructions executed so far
    pub executed_ticks: u64,
    /// Ticks spent waiting in the ready queue
    pub ready_wait: u64,
    /// Completion cycle minus admission cycle, once terminated
    pub turnaround: Option<u64>,
    pub exit_reason: Option<ExitReason>,
}
