//! Test utilities
//!
//! Sample programs and helpers for driving a kernel in tests and demos.

use crate::{BootError, KernelConfig, SimulatedKernel};
use hal::RamDisk;
use kernel_api::{KernelApi, KernelError, TickOutcome};
use services_storage::DiskFileSystem;

/// Sample program images
pub mod programs {
    /// `BRK`
    pub const HALT: &[u8] = &[0x00];

    /// `LDX #1; CPX $0010; BNE -5`: spins on the compare forever
    pub const LOOP_FOREVER: &[u8] = &[0xA2, 0x01, 0xEC, 0x10, 0x00, 0xD0, 0xFB];

    /// Prints `3` in six instructions
    pub const PRINT_THREE: &[u8] = &[
        0xA9, 0x03, 0x8D, 0x20, 0x00, 0xA2, 0x01, 0xAC, 0x20, 0x00, 0xFF, 0x00,
    ];

    /// Prints `HI` in four instructions
    pub const PRINT_HI: &[u8] = &[
        0xA2, 0x02, 0xA0, 0x08, 0xFF, 0x00, 0x00, 0x00, 0x48, 0x49, 0x00,
    ];

    /// `NOP` followed by an undefined opcode
    pub const INVALID_OPCODE: &[u8] = &[0xEA, 0x42];
}

/// Boots a kernel on a freshly formatted RAM disk
pub fn formatted_kernel(config: KernelConfig) -> Result<SimulatedKernel, BootError> {
    let mut fs = DiskFileSystem::mount(RamDisk::new(config.geometry))?;
    fs.format()?;
    SimulatedKernel::boot(config, fs.into_device())
}

/// Delivers `ticks` clock ticks and collects the outcomes
pub fn run_ticks<K: KernelApi>(kernel: &mut K, ticks: u64) -> Result<Vec<TickOutcome>, KernelError> {
    (0..ticks).map(|_| kernel.clock_tick()).collect()
}

/// Ids of the processes each tick executed, idle ticks skipped
pub fn execution_trace(outcomes: &[TickOutcome]) -> Vec<core_types::ProcessId> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            TickOutcome::Executed(pid) | TickOutcome::Preempted(pid) => Some(*pid),
            TickOutcome::Exited { pid, .. } => Some(*pid),
            TickOutcome::Idle => None,
        })
        .collect()
}
