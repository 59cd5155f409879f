//! # Dispatcher
//!
//! Admission, context switches, roll-in/roll-out and termination.
//!
//! ## Design
//!
//! - **Admission** places a new image in the lowest free partition, or in a
//!   swap file named `~<pid>` when memory is full and the disk is formatted.
//! - **Dispatch** takes the head of the ready queue. If its image is on disk
//!   it is rolled in first, rolling out a victim when no partition is free.
//! - **Victim selection** prefers the memory-resident ready process nearest
//!   the tail of the ready queue, then the lowest-pid memory-resident process
//!   that has not been run yet.
//! - **Termination** frees the partition, stamps completion time and halts
//!   the CPU when nothing is left to run.
//!
//! Swap images are always a full partition long. Every failure on the
//! dispatch path is an internal error: the kernel cannot continue a context
//! switch halfway.

use crate::pcb::{swap_file_name, ProcessControlBlock};
use crate::{missing_pcb, storage_error, SimulatedKernel};
use core_types::ProcessId;
use hal::{ConsoleDevice, DiskDevice};
use kernel_api::{ExitReason, KernelError, LoadReceipt, Location, ProcessState};
use services_logger::{LogEntry, LogLevel};

/// Dispatcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub admitted: u64,
    pub context_switches: u64,
    pub preemptions: u64,
    pub roll_ins: u64,
    pub roll_outs: u64,
    pub completed: u64,
    pub killed: u64,
    pub faulted: u64,
}

fn internal(context: impl std::fmt::Display, err: impl std::fmt::Display) -> KernelError {
    KernelError::Internal(format!("{}: {}", context, err))
}

impl<D: DiskDevice> SimulatedKernel<D> {
    /// Admits a new program
    ///
    /// The pid is allocated only if admission succeeds.
    pub(crate) fn admit(&mut self, image: &[u8], priority: u8) -> Result<LoadReceipt, KernelError> {
        if image.is_empty() {
            return Err(KernelError::InvalidProgram("program is empty".to_string()));
        }
        let capacity = self.memory.partition_size();
        if image.len() > capacity {
            return Err(KernelError::ProgramTooLarge {
                size: image.len(),
                capacity,
            });
        }

        let pid = self.next_pid.ok_or(KernelError::PidsExhausted)?;
        let mut pcb = ProcessControlBlock::new(pid, priority, image.to_vec(), self.clock);

        if let Some(index) = self.memory.find_free_partition() {
            let partition = self
                .memory
                .allocate(index, pid, image)
                .map_err(|e| internal("cannot load into a free partition", e))?;
            pcb.place_in_memory(partition);
        } else if self.fs.is_formatted() {
            self.write_swap_file(pid, image)?;
            pcb.place_on_disk();
        } else {
            return Err(KernelError::OutOfMemory);
        }

        let receipt = LoadReceipt {
            pid,
            location: pcb.location,
            partition: pcb.partition,
        };
        self.processes.insert(pid, pcb);
        self.next_pid = pid.next();
        self.stats.admitted += 1;

        let mut entry = LogEntry::new(LogLevel::Info, "loaded")
            .with_source(pid)
            .with_field("location", receipt.location)
            .with_field("priority", priority);
        if let Some(index) = receipt.partition {
            entry = entry.with_field("partition", index);
        }
        self.trace(entry);
        Ok(receipt)
    }

    /// Switches the CPU to the head of the ready queue
    ///
    /// Returns None if the ready queue is empty.
    pub(crate) fn dispatch_next(&mut self) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.scheduler.dequeue_next() else {
            return Ok(None);
        };

        let location = self
            .processes
            .get(&pid)
            .map(|pcb| pcb.location)
            .ok_or_else(|| missing_pcb(pid))?;
        if location == Location::Disk {
            self.roll_in(pid)?;
        }

        let pcb = self.pcb_mut(pid)?;
        pcb.state = ProcessState::Running;
        let registers = pcb.registers;
        let partition = pcb.partition;
        self.cpu.load(registers);
        self.stats.context_switches += 1;

        let mut entry = LogEntry::new(LogLevel::Debug, "dispatched")
            .with_source(pid)
            .with_field("pc", registers.pc);
        if let Some(index) = partition {
            entry = entry.with_field("partition", index);
        }
        self.trace(entry);
        Ok(Some(pid))
    }

    /// Saves the running process and moves it to the tail of the ready queue
    pub(crate) fn preempt_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.scheduler.current() else {
            return Ok(None);
        };

        let registers = self.cpu.save();
        let pcb = self.pcb_mut(pid)?;
        pcb.registers = registers;
        pcb.state = ProcessState::Ready;
        self.scheduler.preempt_current();
        self.stats.preemptions += 1;

        self.trace(
            LogEntry::new(LogLevel::Debug, "quantum expired")
                .with_source(pid)
                .with_field("pc", registers.pc),
        );
        Ok(Some(pid))
    }

    /// Brings a swapped-out process back into memory
    ///
    /// The swap file is read and deleted before any victim is rolled out,
    /// which guarantees the victim's swap file fits.
    pub(crate) fn roll_in(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let name = swap_file_name(pid);
        let image = self
            .fs
            .read(&name)
            .map_err(|e| internal(format!("cannot read swap file {}", name), storage_error(e)))?;
        self.fs
            .delete(&name)
            .map_err(|e| internal(format!("cannot delete swap file {}", name), storage_error(e)))?;

        let index = match self.memory.find_free_partition() {
            Some(index) => index,
            None => {
                let victim = self.select_roll_out_victim().ok_or_else(|| {
                    KernelError::Internal(format!(
                        "no process can be rolled out to make room for {}",
                        pid
                    ))
                })?;
                self.roll_out(victim)?;
                self.memory.find_free_partition().ok_or_else(|| {
                    KernelError::Internal("roll-out did not free a partition".to_string())
                })?
            }
        };

        let partition = self
            .memory
            .allocate(index, pid, &image)
            .map_err(|e| internal(format!("cannot roll in process {}", pid), e))?;
        self.processes
            .get_mut(&pid)
            .ok_or_else(|| missing_pcb(pid))?
            .place_in_memory(partition);
        self.stats.roll_ins += 1;

        self.trace(
            LogEntry::new(LogLevel::Info, "rolled in")
                .with_source(pid)
                .with_field("partition", index)
                .with_field("file", name),
        );
        Ok(())
    }

    /// Moves a memory-resident process out to its swap file
    pub(crate) fn roll_out(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let index = self
            .processes
            .get(&pid)
            .ok_or_else(|| missing_pcb(pid))?
            .partition
            .ok_or_else(|| {
                KernelError::Internal(format!("process {} holds no partition to roll out", pid))
            })?;
        let (base, limit) = self
            .memory
            .partition(index)
            .map(|p| (p.base, p.limit))
            .ok_or_else(|| KernelError::Internal(format!("no partition {}", index)))?;

        let image = self
            .memory
            .read_partition(index)
            .map_err(|e| internal(format!("cannot read partition {}", index), e))?;
        self.write_swap_file(pid, &image)
            .map_err(|e| internal(format!("cannot roll out process {}", pid), e))?;
        self.memory
            .free(base, limit)
            .map_err(|e| internal(format!("cannot free partition {}", index), e))?;
        self.pcb_mut(pid)?.place_on_disk();
        self.stats.roll_outs += 1;

        self.trace(
            LogEntry::new(LogLevel::Info, "rolled out")
                .with_source(pid)
                .with_field("partition", index)
                .with_field("file", swap_file_name(pid)),
        );
        Ok(())
    }

    /// Picks the process to roll out when memory is full
    ///
    /// Deterministic for a given ready queue and process table.
    pub fn select_roll_out_victim(&self) -> Option<ProcessId> {
        let from_queue = self.scheduler.queued().into_iter().rev().find(|pid| {
            self.processes.get(pid).is_some_and(|pcb| {
                pcb.state == ProcessState::Ready && pcb.is_memory_resident()
            })
        });

        from_queue.or_else(|| {
            self.processes
                .values()
                .find(|pcb| pcb.state == ProcessState::Resident && pcb.is_memory_resident())
                .map(|pcb| pcb.pid)
        })
    }

    /// Ends a process
    ///
    /// A process on disk keeps its swap file.
    pub(crate) fn terminate(&mut self, pid: ProcessId, reason: ExitReason) -> Result<(), KernelError> {
        let was_running = self.scheduler.current() == Some(pid);
        let live_registers = was_running.then(|| self.cpu.save());
        self.scheduler.exit_process(pid, reason.clone());

        let clock = self.clock;
        let pcb = self.pcb_mut(pid)?;
        if let Some(registers) = live_registers {
            pcb.registers = registers;
        }
        let bounds = pcb.bounds;
        let turnaround = clock.saturating_sub(pcb.admitted_at);
        let ready_wait = pcb.ready_wait;
        pcb.finish(reason.clone(), clock);

        if let Some(bounds) = bounds {
            self.memory
                .free(bounds.base, bounds.limit)
                .map_err(|e| internal(format!("cannot free memory of process {}", pid), e))?;
        }
        if was_running {
            self.cpu.clear();
        }
        if self.scheduler.current().is_none() && !self.scheduler.has_ready() {
            self.cpu.set_executing(false);
        }
        if !self.console.current_line().is_empty() {
            self.console.advance_line();
        }

        let level = match &reason {
            ExitReason::Completed => {
                self.stats.completed += 1;
                LogLevel::Info
            }
            ExitReason::Killed => {
                self.stats.killed += 1;
                LogLevel::Warn
            }
            ExitReason::Faulted { .. } => {
                self.stats.faulted += 1;
                LogLevel::Error
            }
        };
        self.trace(
            LogEntry::new(level, "terminated")
                .with_source(pid)
                .with_field("reason", &reason)
                .with_field("turnaround", turnaround)
                .with_field("wait", ready_wait),
        );
        Ok(())
    }

    /// Writes a process image to its swap file, padded to a full partition
    ///
    /// A swap file left over from an earlier session is overwritten. On a
    /// failed write the new directory entry is removed again.
    fn write_swap_file(&mut self, pid: ProcessId, image: &[u8]) -> Result<(), KernelError> {
        let name = swap_file_name(pid);
        let mut padded = image.to_vec();
        padded.resize(self.memory.partition_size(), 0);

        let existed = self.fs.exists(&name).map_err(storage_error)?;
        if !existed {
            self.fs.create(&name).map_err(storage_error)?;
        }
        if let Err(err) = self.fs.write(&name, &padded) {
            if !existed {
                if let Err(cleanup) = self.fs.delete(&name) {
                    self.trace(
                        LogEntry::new(LogLevel::Warn, "swap file left behind")
                            .with_source(pid)
                            .with_field("error", cleanup),
                    );
                }
            }
            return Err(storage_error(err));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{formatted_kernel, programs};
    use crate::KernelConfig;
    use kernel_api::KernelApi;

    #[test]
    fn test_admit_uses_first_free_partition() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        for expected in 0..3 {
            let receipt = kernel.load(programs::HALT).unwrap();
            assert_eq!(receipt.partition, Some(expected));
            assert_eq!(receipt.location, Location::Memory);
        }
        let receipt = kernel.load(programs::HALT).unwrap();
        assert_eq!(receipt.location, Location::Disk);
        assert_eq!(receipt.partition, None);
        assert!(kernel.file_system().exists("~3").unwrap());
        assert_eq!(kernel.file_system().read("~3").unwrap().len(), 256);
    }

    #[test]
    fn test_last_pid_is_never_reused() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        kernel.next_pid = Some(ProcessId::new(u32::MAX));

        let last = kernel.load(programs::HALT).unwrap();
        assert_eq!(last.pid, ProcessId::new(u32::MAX));

        assert_eq!(kernel.load(programs::HALT), Err(KernelError::PidsExhausted));
        assert_eq!(kernel.processes().len(), 1);
        assert_eq!(kernel.memory_manager().active_count(), 1);
    }

    #[test]
    fn test_admit_without_disk_is_out_of_memory() {
        let mut kernel = SimulatedKernel::new().unwrap();
        for _ in 0..3 {
            kernel.load(programs::HALT).unwrap();
        }
        assert_eq!(kernel.load(programs::HALT), Err(KernelError::OutOfMemory));
        // The failed load did not consume a pid
        kernel.kill(ProcessId::new(0)).unwrap();
        assert_eq!(kernel.load(programs::HALT).unwrap().pid, ProcessId::new(3));
    }

    #[test]
    fn test_admit_validation() {
        let mut kernel = SimulatedKernel::new().unwrap();
        assert!(matches!(
            kernel.load(&[]),
            Err(KernelError::InvalidProgram(_))
        ));
        assert_eq!(
            kernel.load(&[0xEA; 257]),
            Err(KernelError::ProgramTooLarge {
                size: 257,
                capacity: 256
            })
        );
        assert!(kernel.processes().is_empty());
        assert_eq!(kernel.stats().admitted, 0);
    }

    #[test]
    fn test_victim_prefers_tail_of_ready_queue() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        for _ in 0..3 {
            kernel.load(programs::LOOP_FOREVER).unwrap();
        }
        kernel.run(ProcessId::new(0)).unwrap();
        kernel.run(ProcessId::new(1)).unwrap();
        assert_eq!(kernel.select_roll_out_victim(), Some(ProcessId::new(1)));

        // Only resident processes left: lowest pid wins
        kernel.kill(ProcessId::new(0)).unwrap();
        kernel.kill(ProcessId::new(1)).unwrap();
        assert_eq!(kernel.select_roll_out_victim(), Some(ProcessId::new(2)));
    }

    #[test]
    fn test_roll_in_swaps_out_victim() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        for _ in 0..4 {
            kernel.load(programs::LOOP_FOREVER).unwrap();
        }
        kernel.run(ProcessId::new(3)).unwrap();
        kernel.clock_tick().unwrap();

        let incoming = kernel.process(ProcessId::new(3)).unwrap();
        assert_eq!(incoming.location, Location::Memory);
        assert_eq!(incoming.partition, Some(0));

        let victim = kernel.process(ProcessId::new(0)).unwrap();
        assert_eq!(victim.location, Location::Disk);
        assert_eq!(kernel.stats().roll_outs, 1);
        assert_eq!(kernel.stats().roll_ins, 1);

        let fs = kernel.file_system();
        assert!(fs.exists("~0").unwrap());
        assert!(!fs.exists("~3").unwrap());
        fs.verify().unwrap();
    }

    #[test]
    fn test_rolled_out_image_survives_round_trip() {
        let mut kernel = formatted_kernel(KernelConfig::default()).unwrap();
        kernel.load(programs::PRINT_THREE).unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();

        // Running pid 3 pushes pid 0 out; killing pid 3 and running pid 0
        // brings it back into the freed partition.
        kernel.run(ProcessId::new(3)).unwrap();
        kernel.clock_tick().unwrap();
        kernel.kill(ProcessId::new(3)).unwrap();
        kernel.run(ProcessId::new(0)).unwrap();
        kernel.run_until_idle(100).unwrap();

        assert_eq!(kernel.take_output(), vec!["3".to_string()]);
        let pcb = kernel.process(ProcessId::new(0)).unwrap();
        assert_eq!(pcb.exit_reason, Some(ExitReason::Completed));
    }

    #[test]
    fn test_terminate_frees_partition_and_halts() {
        let mut kernel = SimulatedKernel::new().unwrap();
        kernel.load(programs::LOOP_FOREVER).unwrap();
        kernel.run(ProcessId::new(0)).unwrap();
        kernel.clock_tick().unwrap();

        kernel.kill(ProcessId::new(0)).unwrap();
        assert!(!kernel.is_executing());
        assert_eq!(kernel.memory_manager().active_count(), 0);
        assert_eq!(kernel.cpu().save(), kernel_api::Registers::default());
        assert_eq!(kernel.stats().killed, 1);
    }

    #[test]
    fn test_swap_write_failure_leaves_no_entry() {
        use services_storage::{FailingDisk, FailurePolicy};

        let config = KernelConfig::default();
        let disk = FailingDisk::new(hal::RamDisk::new(config.geometry), FailurePolicy::Never);
        let mut fs = services_storage::DiskFileSystem::mount(disk).unwrap();
        fs.format().unwrap();
        let mut kernel = SimulatedKernel::boot(config, fs.into_device()).unwrap();
        for _ in 0..3 {
            kernel.load(programs::HALT).unwrap();
        }

        kernel
            .file_system()
            .device_mut()
            .set_policy(FailurePolicy::OnTracks(vec![1, 2, 3]));
        assert!(matches!(
            kernel.load(programs::HALT),
            Err(KernelError::Internal(_))
        ));
        kernel
            .file_system()
            .device_mut()
            .set_policy(FailurePolicy::Never);
        assert!(kernel.file_system().entries().unwrap().is_empty());
        assert_eq!(kernel.processes().len(), 3);
    }
}
