//! Kernel Scenario Test Utilities
//!
//! This crate provides shared utilities for cross-crate scenario tests.
//!
//! ## Test Philosophy
//!
//! - **Invariants after every step**: partition ownership, residency and
//!   chain disjointness are checked after each tick, not only at the end
//! - **Deterministic runs**: every scenario is a fixed sequence of calls
//! - **Observable scheduling**: order is asserted through the scheduler's
//!   audit log rather than inferred from output

use core_types::ProcessId;
use kernel_api::{KernelApi, KernelError, Location, ProcessState, TickOutcome};
use sim_kernel::scheduler::ScheduleEvent;
use sim_kernel::test_utils::formatted_kernel;
use sim_kernel::{KernelConfig, SimulatedKernel};

/// Boots a kernel with the default configuration on a formatted disk
pub fn test_bootstrap() -> SimulatedKernel {
    boot_with(KernelConfig::default())
}

/// Boots a kernel with `config` on a formatted disk
///
/// Panics if the configuration is rejected.
pub fn boot_with(config: KernelConfig) -> SimulatedKernel {
    match formatted_kernel(config) {
        Ok(kernel) => kernel,
        Err(err) => panic!("boot failed: {}", err),
    }
}

/// Loads each image with the default priority and returns the pids
pub fn load_all(kernel: &mut SimulatedKernel, images: &[&[u8]]) -> Result<Vec<ProcessId>, KernelError> {
    images
        .iter()
        .map(|image| kernel.load(image).map(|receipt| receipt.pid))
        .collect()
}

/// Pids in the order the scheduler selected them
pub fn selections(events: &[ScheduleEvent]) -> Vec<ProcessId> {
    events
        .iter()
        .filter_map(|event| match event {
            ScheduleEvent::ProcessSelected { pid, .. } => Some(*pid),
            _ => None,
        })
        .collect()
}

/// Pids in the order the scheduler preempted them
pub fn preemptions(events: &[ScheduleEvent]) -> Vec<ProcessId> {
    events
        .iter()
        .filter_map(|event| match event {
            ScheduleEvent::ProcessPreempted { pid, .. } => Some(*pid),
            _ => None,
        })
        .collect()
}

/// Ticks the clock `ticks` times, checking invariants after each tick
pub fn tick_checked(kernel: &mut SimulatedKernel, ticks: u64) -> Vec<TickOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..ticks {
        match kernel.clock_tick() {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => panic!("tick {} failed: {}", kernel.clock(), err),
        }
        assert_invariants(kernel);
    }
    outcomes
}

/// Checks the memory and residency invariants
///
/// - Active partitions never overlap and never exceed the partition count
/// - A live process in memory owns exactly the partition it records
/// - A live process on disk owns no partition and has a swap file
/// - At most one process is running, and it is the scheduler's current one
pub fn assert_invariants(kernel: &mut SimulatedKernel) {
    let partitions = kernel.memory_manager().partitions().to_vec();
    let active: Vec<_> = partitions.iter().filter(|p| p.active).collect();
    assert!(active.len() <= kernel.config().partition_count);
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            assert!(
                !a.bounds().overlaps(&b.bounds()),
                "partitions {} and {} overlap",
                a.index,
                b.index
            );
        }
    }

    let snapshots = kernel.processes();
    let running: Vec<_> = snapshots
        .iter()
        .filter(|p| p.state == ProcessState::Running)
        .map(|p| p.pid)
        .collect();
    assert!(running.len() <= 1);
    assert_eq!(running.first().copied(), kernel.scheduler().current());

    for snapshot in snapshots.iter().filter(|p| !p.state.is_terminal()) {
        match snapshot.location {
            Location::Memory => {
                let index = snapshot
                    .partition
                    .unwrap_or_else(|| panic!("pid {} in memory without a partition", snapshot.pid));
                let partition = &partitions[index];
                assert!(partition.active);
                assert_eq!(partition.owner, Some(snapshot.pid));
            }
            Location::Disk => {
                assert_eq!(snapshot.partition, None);
                assert!(partitions.iter().all(|p| p.owner != Some(snapshot.pid)));
                let swap = sim_kernel::swap_file_name(snapshot.pid);
                assert!(
                    kernel.file_system().exists(&swap).unwrap_or(false),
                    "pid {} on disk without {}",
                    snapshot.pid,
                    swap
                );
            }
        }
    }

    for partition in active {
        let owner = partition.owner.unwrap_or_else(|| panic!("active partition without owner"));
        let snapshot = snapshots
            .iter()
            .find(|p| p.pid == owner)
            .unwrap_or_else(|| panic!("partition owned by unknown pid {}", owner));
        assert!(!snapshot.state.is_terminal());
    }

    assert!(kernel.file_system().verify().is_ok());
}
