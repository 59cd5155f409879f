//! # Simulated Kernel
//!
//! This crate is the operating system simulator: CPU, main memory, the
//! fixed-partition memory manager, process control blocks, the round-robin
//! scheduler and the dispatcher, wired to a disk file system.
//!
//! ## Purpose
//!
//! - Deterministic: the only source of progress is `clock_tick`
//! - Inspectable: every piece of state can be read back for testing
//! - Single-threaded: one instruction per tick, kill and load only between
//!   instructions
//!
//! ## Philosophy
//!
//! **One context object owns everything.**
//!
//! There are no globals. `SimulatedKernel` owns the CPU, memory, ready queue,
//! process table and disk, and every operation goes through it.

pub mod config;
pub mod cpu;
pub mod dispatcher;
pub mod memory;
pub mod memory_manager;
pub mod pcb;
pub mod program;
pub mod scheduler;
pub mod test_utils;
pub mod timer;

pub use config::{ConfigError, KernelConfig};
pub use cpu::{Cpu, CpuFault, Opcode, StepOutcome};
pub use dispatcher::DispatchStats;
pub use memory::{Bounds, Memory, MemoryError};
pub use memory_manager::{AllocationError, MemoryManager, Partition};
pub use pcb::{swap_file_name, ProcessControlBlock};
pub use program::parse_program_text;
pub use scheduler::{ScheduleEvent, Scheduler, SchedulerConfig};

use core_types::ProcessId;
use hal::{BufferedConsole, DiskDevice, DiskGeometry, RamDisk};
use kernel_api::{
    ExitReason, KernelApi, KernelError, LoadReceipt, Location, ProcessSnapshot, ProcessState,
    TickOutcome,
};
use services_logger::{KernelLog, LogEntry, LogLevel};
use services_storage::{is_reserved_name, DiskFileSystem, DiskImage, FileSystemError, ImageError};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while booting the kernel
#[derive(Debug, Error)]
pub enum BootError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot mount disk: {0}")]
    Storage(#[from] FileSystemError),

    #[error("Disk geometry {actual:?} does not match configured {expected:?}")]
    GeometryMismatch {
        expected: DiskGeometry,
        actual: DiskGeometry,
    },
}

/// Simulated kernel state
pub struct SimulatedKernel<D: DiskDevice = RamDisk> {
    config: KernelConfig,
    /// Ticks delivered so far
    clock: u64,
    cpu: Cpu,
    memory: MemoryManager,
    fs: DiskFileSystem<D>,
    scheduler: Scheduler,
    processes: BTreeMap<ProcessId, ProcessControlBlock>,
    /// None once every pid has been handed out
    next_pid: Option<ProcessId>,
    console: BufferedConsole,
    log: KernelLog,
    stats: DispatchStats,
}

impl SimulatedKernel<RamDisk> {
    /// Boots with the default configuration and a blank RAM disk
    pub fn new() -> Result<Self, BootError> {
        Self::with_config(KernelConfig::default())
    }

    /// Boots with a blank RAM disk of the configured geometry
    pub fn with_config(config: KernelConfig) -> Result<Self, BootError> {
        let disk = RamDisk::new(config.geometry);
        Self::boot(config, disk)
    }
}

impl<D: DiskDevice> SimulatedKernel<D> {
    /// Boots the kernel on the given disk
    ///
    /// A disk that already carries a file system is mounted as is.
    pub fn boot(config: KernelConfig, disk: D) -> Result<Self, BootError> {
        config.validate()?;
        let actual = disk.geometry();
        if actual != config.geometry {
            return Err(BootError::GeometryMismatch {
                expected: config.geometry,
                actual,
            });
        }

        let fs = DiskFileSystem::mount(disk)?;
        let mut log = KernelLog::with_capacity(config.log_capacity);
        log.record(
            LogEntry::new(LogLevel::Info, "kernel booted")
                .with_field("partitions", config.partition_count)
                .with_field("partition_size", config.partition_size())
                .with_field("quantum", config.quantum)
                .with_field("disk_formatted", fs.is_formatted()),
        );

        Ok(Self {
            memory: MemoryManager::new(config.memory_size, config.partition_count),
            scheduler: Scheduler::with_config(SchedulerConfig {
                quantum_ticks: config.quantum,
            }),
            config,
            clock: 0,
            cpu: Cpu::new(),
            fs,
            processes: BTreeMap::new(),
            next_pid: Some(ProcessId::new(0)),
            console: BufferedConsole::new(),
            log,
            stats: DispatchStats::default(),
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Ticks delivered so far
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn memory_manager(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn file_system(&mut self) -> &mut DiskFileSystem<D> {
        &mut self.fs
    }

    pub fn process(&self, pid: ProcessId) -> Option<&ProcessControlBlock> {
        self.processes.get(&pid)
    }

    /// Ready queue contents, head first
    pub fn ready_queue(&self) -> Vec<ProcessId> {
        self.scheduler.queued()
    }

    pub fn console(&self) -> &BufferedConsole {
        &self.console
    }

    /// Drains console output
    pub fn take_output(&mut self) -> Vec<String> {
        self.console.take_output()
    }

    pub fn log(&self) -> &KernelLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut KernelLog {
        &mut self.log
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Snapshots the disk for persistence
    pub fn capture_disk(&mut self) -> Result<DiskImage, ImageError> {
        DiskImage::capture(self.fs.device_mut())
    }

    pub fn into_disk(self) -> D {
        self.fs.into_device()
    }

    /// Ticks the clock until the CPU stops executing
    ///
    /// Returns the number of ticks delivered, at most `max_ticks`.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> Result<u64, KernelError> {
        let mut ticks = 0;
        while ticks < max_ticks && self.cpu.is_executing() {
            self.clock_tick()?;
            ticks += 1;
        }
        Ok(ticks)
    }

    fn trace(&mut self, entry: LogEntry) {
        self.log.record(entry.at_tick(self.clock));
    }

    fn halt(&mut self, err: &KernelError) {
        self.cpu.set_executing(false);
        self.trace(LogEntry::new(LogLevel::Error, "CPU halted").with_field("error", err));
    }

    fn pcb_mut(&mut self, pid: ProcessId) -> Result<&mut ProcessControlBlock, KernelError> {
        self.processes.get_mut(&pid).ok_or_else(|| missing_pcb(pid))
    }

    fn charge_ready_wait(&mut self) {
        for pid in self.scheduler.queued() {
            if let Some(pcb) = self.processes.get_mut(&pid) {
                pcb.ready_wait += 1;
            }
        }
    }

    fn execute_tick(&mut self) -> Result<TickOutcome, KernelError> {
        if !self.cpu.is_executing() {
            self.scheduler.on_tick_advanced(1);
            return Ok(TickOutcome::Idle);
        }

        if self.scheduler.current().is_none() && self.dispatch_next()?.is_none() {
            self.cpu.set_executing(false);
            self.scheduler.on_tick_advanced(1);
            return Ok(TickOutcome::Idle);
        }
        let pid = self
            .scheduler
            .current()
            .ok_or_else(|| KernelError::Internal("dispatch produced no process".to_string()))?;
        self.charge_ready_wait();

        let bounds = self
            .processes
            .get(&pid)
            .and_then(|pcb| pcb.bounds)
            .ok_or_else(|| {
                KernelError::Internal(format!("running process {} holds no partition", pid))
            })?;
        let outcome = self
            .cpu
            .step(self.memory.memory_mut(), bounds, &mut self.console);
        self.pcb_mut(pid)?.executed_ticks += 1;
        self.scheduler.on_tick_advanced(1);

        match outcome {
            StepOutcome::Continue => {
                if self.scheduler.should_preempt() {
                    self.preempt_current()?;
                    Ok(TickOutcome::Preempted(pid))
                } else {
                    Ok(TickOutcome::Executed(pid))
                }
            }
            StepOutcome::Break => {
                self.terminate(pid, ExitReason::Completed)?;
                Ok(TickOutcome::Exited {
                    pid,
                    reason: ExitReason::Completed,
                })
            }
            StepOutcome::Fault(fault) => {
                let reason = ExitReason::Faulted {
                    detail: fault.to_string(),
                };
                self.terminate(pid, reason.clone())?;
                Ok(TickOutcome::Exited { pid, reason })
            }
            StepOutcome::Idle => Ok(TickOutcome::Idle),
        }
    }

    fn check_user_name(name: &str) -> Result<(), KernelError> {
        if is_reserved_name(name) {
            return Err(KernelError::ReservedFileName(name.to_string()));
        }
        Ok(())
    }
}

/// Maps a file system error onto the kernel taxonomy
pub(crate) fn storage_error(err: FileSystemError) -> KernelError {
    match err {
        FileSystemError::NotFormatted => KernelError::DiskNotFormatted,
        FileSystemError::InvalidName(name) => KernelError::InvalidFileName(name),
        FileSystemError::FileExists(name) => KernelError::FileExists(name),
        FileSystemError::FileNotFound(name) => KernelError::FileNotFound(name),
        FileSystemError::DirectoryFull => KernelError::DirectoryFull,
        FileSystemError::DiskFull { needed, available } => {
            KernelError::DiskFull { needed, available }
        }
        err @ (FileSystemError::UnsupportedGeometry(_)
        | FileSystemError::Device(_)
        | FileSystemError::Corrupt(_)) => KernelError::Internal(err.to_string()),
    }
}

pub(crate) fn missing_pcb(pid: ProcessId) -> KernelError {
    KernelError::Internal(format!("process {} has no control block", pid))
}

impl<D: DiskDevice> KernelApi for SimulatedKernel<D> {
    fn load(&mut self, image: &[u8]) -> Result<LoadReceipt, KernelError> {
        let priority = self.config.default_priority;
        self.admit(image, priority)
    }

    fn load_with_priority(
        &mut self,
        image: &[u8],
        priority: u8,
    ) -> Result<LoadReceipt, KernelError> {
        self.admit(image, priority)
    }

    fn run(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let pcb = self
            .processes
            .get_mut(&pid)
            .ok_or(KernelError::ProcessNotFound(pid))?;
        match pcb.state {
            ProcessState::Resident => pcb.state = ProcessState::Ready,
            ProcessState::Terminated => return Err(KernelError::AlreadyTerminated(pid)),
            state => return Err(KernelError::ProcessNotResident { pid, state }),
        }

        self.scheduler.enqueue(pid);
        self.cpu.set_executing(true);
        self.trace(LogEntry::new(LogLevel::Info, "ready").with_source(pid));
        Ok(())
    }

    fn run_all(&mut self) -> Vec<ProcessId> {
        let resident: Vec<ProcessId> = self
            .processes
            .values()
            .filter(|pcb| pcb.state == ProcessState::Resident)
            .map(|pcb| pcb.pid)
            .collect();
        resident
            .into_iter()
            .filter(|pid| self.run(*pid).is_ok())
            .collect()
    }

    fn processes(&self) -> Vec<ProcessSnapshot> {
        let running = self.scheduler.current();
        self.processes
            .values()
            .map(|pcb| {
                let live = (running == Some(pcb.pid)).then(|| self.cpu.save());
                pcb.snapshot(live)
            })
            .collect()
    }

    fn kill(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let pcb = self
            .processes
            .get(&pid)
            .ok_or(KernelError::ProcessNotFound(pid))?;
        if !pcb.is_live() {
            return Err(KernelError::AlreadyTerminated(pid));
        }
        self.terminate(pid, ExitReason::Killed)
            .inspect_err(|err| self.halt(err))
    }

    fn kill_all(&mut self) -> Vec<ProcessId> {
        let live: Vec<ProcessId> = self
            .processes
            .values()
            .filter(|pcb| pcb.is_live())
            .map(|pcb| pcb.pid)
            .collect();
        live.into_iter().filter(|pid| self.kill(*pid).is_ok()).collect()
    }

    fn set_quantum(&mut self, quantum: u32) -> Result<(), KernelError> {
        self.scheduler
            .set_quantum(quantum)
            .map_err(|_| KernelError::InvalidQuantum(quantum))?;
        self.trace(LogEntry::new(LogLevel::Info, "quantum changed").with_field("quantum", quantum));
        Ok(())
    }

    fn quantum(&self) -> u32 {
        self.scheduler.quantum()
    }

    fn is_executing(&self) -> bool {
        self.cpu.is_executing()
    }

    fn clock_tick(&mut self) -> Result<TickOutcome, KernelError> {
        self.clock += 1;
        self.execute_tick().inspect_err(|err| {
            if err.is_internal() {
                self.halt(err);
            }
        })
    }

    fn format_disk(&mut self) -> Result<(), KernelError> {
        if self.cpu.is_executing() {
            return Err(KernelError::CpuBusy("format the disk".to_string()));
        }
        let swapped = self
            .processes
            .values()
            .any(|pcb| pcb.is_live() && pcb.location == Location::Disk);
        if swapped {
            return Err(KernelError::SwapInUse);
        }

        self.fs.format().map_err(storage_error)?;
        self.trace(LogEntry::new(LogLevel::Info, "disk formatted"));
        Ok(())
    }

    fn create_file(&mut self, name: &str) -> Result<(), KernelError> {
        Self::check_user_name(name)?;
        self.fs.create(name).map_err(storage_error)?;
        self.trace(LogEntry::new(LogLevel::Debug, "file created").with_field("name", name));
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, KernelError> {
        Self::check_user_name(name)?;
        self.fs.read(name).map_err(storage_error)
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), KernelError> {
        Self::check_user_name(name)?;
        self.fs.write(name, data).map_err(storage_error)?;
        self.trace(
            LogEntry::new(LogLevel::Debug, "file written")
                .with_field("name", name)
                .with_field("bytes", data.len()),
        );
        Ok(())
    }

    fn delete_file(&mut self, name: &str) -> Result<(), KernelError> {
        Self::check_user_name(name)?;
        self.fs.delete(name).map_err(storage_error)?;
        self.trace(LogEntry::new(LogLevel::Debug, "file deleted").with_field("name", name));
        Ok(())
    }

    fn copy_file(&mut self, from: &str, to: &str) -> Result<(), KernelError> {
        Self::check_user_name(from)?;
        Self::check_user_name(to)?;
        self.fs.copy(from, to).map_err(storage_error)?;
        self.trace(
            LogEntry::new(LogLevel::Debug, "file copied")
                .with_field("from", from)
                .with_field("to", to),
        );
        Ok(())
    }

    fn rename_file(&mut self, from: &str, to: &str) -> Result<(), KernelError> {
        Self::check_user_name(from)?;
        Self::check_user_name(to)?;
        self.fs.rename(from, to).map_err(storage_error)?;
        self.trace(
            LogEntry::new(LogLevel::Debug, "file renamed")
                .with_field("from", from)
                .with_field("to", to),
        );
        Ok(())
    }

    fn list_files(&mut self) -> Result<Vec<String>, KernelError> {
        self.fs.list().map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{formatted_kernel, programs, run_ticks};
    use kernel_api::Registers;

    fn pid(n: u32) -> ProcessId {
        ProcessId::new(n)
    }

    #[test]
    fn test_boot_defaults() {
        let kernel = SimulatedKernel::new().unwrap();
        assert_eq!(kernel.clock(), 0);
        assert_eq!(kernel.quantum(), 6);
        assert!(!kernel.is_executing());
        assert_eq!(kernel.memory_manager().partitions().len(), 3);
        assert_eq!(kernel.log().len(), 1);
    }

    #[test]
    fn test_boot_rejects_bad_config() {
        let config = KernelConfig {
            quantum: 0,
            ..KernelConfig::default()
        };
        assert!(matches!(
            SimulatedKernel::with_config(config),
            Err(BootError::Config(ConfigError::ZeroQuantum))
        ));
    }

    #[test]
    fn test_boot_rejects_geometry_mismatch() {
        let small = DiskGeometry {
            tracks: 2,
            ..DiskGeometry::standard()
        };
        assert!(matches!(
            SimulatedKernel::boot(KernelConfig::default(), RamDisk::new(small)),
            Err(BootError::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn test_pids_are_monotonic() {
        let mut kernel = SimulatedKernel::new().unwrap();
        let a = kernel.load(programs::HALT).unwrap().pid;
        let b = kernel.load_with_priority(programs::HALT, 1).unwrap().pid;
        assert_eq!((a, b), (pid(0), pid(1)));

        let snapshots = kernel.processes();
        assert_eq!(snapshots[0].priority, 5);
        assert_eq!(snapshots[1].priority, 1);
        assert!(snapshots
            .iter()
            .all(|s| s.state == ProcessState::Resident));
    }

    #[test]
    fn test_run_program_to_completion() {
        let mut kernel = SimulatedKernel::new().unwrap();
        let receipt = kernel.load(programs::PRINT_THREE).unwrap();
        kernel.run(receipt.pid).unwrap();
        assert!(kernel.is_executing());

        let ticks = kernel.run_until_idle(100).unwrap();
        assert_eq!(ticks, 6);
        assert!(!kernel.is_executing());
        assert_eq!(kernel.take_output(), vec!["3".to_string()]);

        let pcb = kernel.process(receipt.pid).unwrap();
        assert_eq!(pcb.state, ProcessState::Terminated);
        assert_eq!(pcb.executed_ticks, 6);
        assert_eq!(pcb.turnaround(), Some(6));
        assert_eq!(pcb.registers.acc, 3);
        assert_eq!(kernel.memory_manager().active_count(), 0);
    }

    #[test]
    fn test_run_state_errors() {
        let mut kernel = SimulatedKernel::new().unwrap();
        assert_eq!(kernel.run(pid(9)), Err(KernelError::ProcessNotFound(pid(9))));

        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.run(pid(0)).unwrap();
        assert_eq!(
            kernel.run(pid(0)),
            Err(KernelError::ProcessNotResident {
                pid: pid(0),
                state: ProcessState::Ready
            })
        );

        kernel.kill(pid(0)).unwrap();
        assert_eq!(kernel.run(pid(0)), Err(KernelError::AlreadyTerminated(pid(0))));
        assert_eq!(kernel.kill(pid(0)), Err(KernelError::AlreadyTerminated(pid(0))));
        assert_eq!(kernel.kill(pid(5)), Err(KernelError::ProcessNotFound(pid(5))));
    }

    #[test]
    fn test_fault_terminates_only_offender() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::INVALID_OPCODE).unwrap();
        kernel.load(programs::PRINT_HI).unwrap();
        kernel.run_all();

        kernel.run_until_idle(50).unwrap();
        let listing = kernel.processes();
        assert!(matches!(
            listing[0].exit_reason,
            Some(ExitReason::Faulted { .. })
        ));
        assert_eq!(listing[1].exit_reason, Some(ExitReason::Completed));
        assert_eq!(kernel.take_output(), vec!["HI".to_string()]);
        assert_eq!(kernel.stats().faulted, 1);
    }

    #[test]
    fn test_live_registers_in_listing() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.run(pid(0)).unwrap();
        kernel.clock_tick().unwrap();

        let listing = kernel.processes();
        assert_eq!(listing[0].state, ProcessState::Running);
        let live = listing[0].live_registers.unwrap();
        assert_eq!(live.pc, 2);
        assert_eq!(live.x, 1);
        assert_eq!(listing[0].saved_registers, Registers::default());
    }

    #[test]
    fn test_ready_wait_accounting() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::PRINT_HI).unwrap();
        kernel.load(programs::PRINT_HI).unwrap();
        kernel.run_all();
        kernel.run_until_idle(50).unwrap();

        // pid 1 waits while pid 0 runs its four instructions
        assert_eq!(kernel.process(pid(0)).unwrap().ready_wait, 0);
        assert_eq!(kernel.process(pid(1)).unwrap().ready_wait, 4);
        assert_eq!(kernel.process(pid(1)).unwrap().turnaround(), Some(8));
    }

    #[test]
    fn test_set_quantum() {
        let mut kernel = SimulatedKernel::new().unwrap();
        assert_eq!(kernel.set_quantum(0), Err(KernelError::InvalidQuantum(0)));
        kernel.set_quantum(2).unwrap();
        assert_eq!(kernel.quantum(), 2);
    }

    #[test]
    fn test_kill_all() {
        let mut kernel = SimulatedKernel::new().unwrap();
        for _ in 0..3 {
            kernel.load(programs::LOOP_FOREVER).unwrap();
        }
        kernel.run_all();
        run_ticks(&mut kernel, 4).unwrap();

        assert_eq!(kernel.kill_all(), vec![pid(0), pid(1), pid(2)]);
        assert!(!kernel.is_executing());
        assert!(kernel.ready_queue().is_empty());
        assert_eq!(kernel.memory_manager().active_count(), 0);
        assert!(kernel.kill_all().is_empty());
    }

    #[test]
    fn test_format_rejected_while_executing() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.run(pid(0)).unwrap();
        assert!(matches!(
            kernel.format_disk(),
            Err(KernelError::CpuBusy(_))
        ));
    }

    #[test]
    fn test_format_rejected_while_swapped() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        for _ in 0..4 {
            kernel.load(programs::HALT).unwrap();
        }
        assert_eq!(kernel.format_disk(), Err(KernelError::SwapInUse));

        // A killed process no longer pins its swap file
        kernel.kill(pid(3)).unwrap();
        kernel.format_disk().unwrap();
    }

    #[test]
    fn test_file_operations_require_format() {
        let mut kernel = SimulatedKernel::new().unwrap();
        assert_eq!(kernel.create_file("a"), Err(KernelError::DiskNotFormatted));
        assert_eq!(kernel.list_files(), Err(KernelError::DiskNotFormatted));

        kernel.format_disk().unwrap();
        kernel.create_file("a").unwrap();
        kernel.write_file("a", b"hello").unwrap();
        assert_eq!(kernel.read_file("a").unwrap(), b"hello");
        kernel.copy_file("a", "b").unwrap();
        kernel.rename_file("b", "c").unwrap();
        assert_eq!(kernel.list_files().unwrap(), vec!["a".to_string(), "c".to_string()]);
        kernel.delete_file("a").unwrap();
        assert_eq!(kernel.list_files().unwrap(), vec!["c".to_string()]);
    }

    #[test]
    fn test_swap_names_are_reserved() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        for _ in 0..4 {
            kernel.load(programs::HALT).unwrap();
        }

        let reserved = KernelError::ReservedFileName("~3".to_string());
        assert_eq!(kernel.read_file("~3"), Err(reserved.clone()));
        assert_eq!(kernel.delete_file("~3"), Err(reserved.clone()));
        assert_eq!(kernel.create_file("~3"), Err(reserved.clone()));
        assert_eq!(kernel.rename_file("~3", "mine"), Err(reserved));
        assert!(kernel.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_file_name() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        assert!(matches!(
            kernel.create_file(""),
            Err(KernelError::InvalidFileName(_))
        ));
        assert!(matches!(
            kernel.create_file(&"x".repeat(59)),
            Err(KernelError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_trace_log_records_lifecycle() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::HALT).unwrap();
        kernel.run(pid(0)).unwrap();
        kernel.run_until_idle(10).unwrap();

        let messages: Vec<&str> = kernel
            .log()
            .for_process(pid(0))
            .into_iter()
            .map(|entry| entry.message.as_str())
            .collect();
        assert_eq!(messages, vec!["loaded", "ready", "dispatched", "terminated"]);

        let terminated = kernel.log().for_process(pid(0))[3];
        assert_eq!(terminated.tick, 1);
        assert_eq!(terminated.field("reason"), Some("completed"));
    }
}
