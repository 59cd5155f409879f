//! Round-Robin Scheduler
//!
//! ## Philosophy
//!
//! - **Mechanism, not policy**: The scheduler owns the ready queue and the
//!   time slice. Moving images in and out of memory is the dispatcher's job.
//! - **Determinism first**: Same inputs + same ticks => same schedule.
//! - **No hidden yields**: Preemption is explicit and recorded.
//!
//! ## Design
//!
//! - **Round-robin**: Processes are scheduled in FIFO order.
//! - **Time-sliced execution**: A dispatched process gets a fresh slice of
//!   `quantum` ticks. The slice counter is decremented once per executed
//!   instruction and the scheduler signals preemption when it reaches zero.
//! - **Priorities are recorded, not used**: Every process is equal in the
//!   queue.

use core_types::ProcessId;
use kernel_api::ExitReason;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of ticks a process can run before being preempted
    pub quantum_ticks: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { quantum_ticks: 6 }
    }
}

/// Scheduler errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("quantum must be a positive number of ticks, got {0}")]
    InvalidQuantum(u32),
}

/// Scheduling event for audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Process was selected to run
    ProcessSelected {
        pid: ProcessId,
        timestamp_ticks: u64,
    },
    /// Process was preempted
    ProcessPreempted {
        pid: ProcessId,
        reason: PreemptionReason,
        timestamp_ticks: u64,
    },
    /// Process left the scheduler for good
    ProcessExited {
        pid: ProcessId,
        reason: ExitReason,
        timestamp_ticks: u64,
    },
}

/// Reason for preemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreemptionReason {
    /// Time quantum expired
    QuantumExpired,
}

/// Ready queue
///
/// A FIFO of process ids. A process appears at most once.
#[derive(Debug, Default)]
struct RunQueue {
    queue: VecDeque<ProcessId>,
}

impl RunQueue {
    fn enqueue(&mut self, pid: ProcessId) -> bool {
        if self.contains(pid) {
            return false;
        }
        self.queue.push_back(pid);
        true
    }

    fn dequeue(&mut self) -> Option<ProcessId> {
        self.queue.pop_front()
    }

    fn contains(&self, pid: ProcessId) -> bool {
        self.queue.contains(&pid)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn remove(&mut self, pid: ProcessId) {
        self.queue.retain(|&id| id != pid);
    }
}

/// Round-robin scheduler
pub struct Scheduler {
    config: SchedulerConfig,
    run_queue: RunQueue,
    current: Option<ProcessId>,
    /// Ticks left in the current process's slice
    slice_remaining: u32,
    current_ticks: u64,
    audit_log: Vec<ScheduleEvent>,
}

impl Scheduler {
    /// Creates a new scheduler with default configuration
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a new scheduler with custom configuration
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            slice_remaining: config.quantum_ticks,
            config,
            run_queue: RunQueue::default(),
            current: None,
            current_ticks: 0,
            audit_log: Vec::new(),
        }
    }

    /// Appends a process to the tail of the ready queue
    ///
    /// Returns false if the process is already queued or running.
    pub fn enqueue(&mut self, pid: ProcessId) -> bool {
        if self.current == Some(pid) {
            return false;
        }
        self.run_queue.enqueue(pid)
    }

    /// Takes the head of the ready queue and makes it current
    ///
    /// The new current process gets a full slice. Returns None if the queue
    /// is empty.
    pub fn dequeue_next(&mut self) -> Option<ProcessId> {
        let next = self.run_queue.dequeue();
        self.current = next;

        if let Some(pid) = next {
            self.slice_remaining = self.config.quantum_ticks;
            self.audit_log.push(ScheduleEvent::ProcessSelected {
                pid,
                timestamp_ticks: self.current_ticks,
            });
        }
        next
    }

    /// Advances the scheduler by the given number of ticks
    ///
    /// Charges the ticks against the current process's slice.
    pub fn on_tick_advanced(&mut self, delta_ticks: u64) {
        self.current_ticks += delta_ticks;
        if self.current.is_some() {
            let delta = u32::try_from(delta_ticks).unwrap_or(u32::MAX);
            self.slice_remaining = self.slice_remaining.saturating_sub(delta);
        }
    }

    /// Returns true if the current process has used up its slice
    pub fn should_preempt(&self) -> bool {
        self.current.is_some() && self.slice_remaining == 0
    }

    /// Moves the current process to the tail of the ready queue
    ///
    /// Returns the preempted process, if there was one.
    pub fn preempt_current(&mut self) -> Option<ProcessId> {
        let pid = self.current.take()?;
        self.run_queue.enqueue(pid);
        self.audit_log.push(ScheduleEvent::ProcessPreempted {
            pid,
            reason: PreemptionReason::QuantumExpired,
            timestamp_ticks: self.current_ticks,
        });
        Some(pid)
    }

    /// Removes a process from scheduling
    ///
    /// Works whether the process is current, queued, or neither.
    pub fn exit_process(&mut self, pid: ProcessId, reason: ExitReason) {
        self.run_queue.remove(pid);
        if self.current == Some(pid) {
            self.current = None;
        }
        self.audit_log.push(ScheduleEvent::ProcessExited {
            pid,
            reason,
            timestamp_ticks: self.current_ticks,
        });
    }

    /// Changes the quantum
    ///
    /// The running process keeps its current slice; the new quantum applies
    /// from the next dispatch.
    pub fn set_quantum(&mut self, quantum: u32) -> Result<(), SchedulerError> {
        if quantum == 0 {
            return Err(SchedulerError::InvalidQuantum(quantum));
        }
        self.config.quantum_ticks = quantum;
        Ok(())
    }

    pub fn quantum(&self) -> u32 {
        self.config.quantum_ticks
    }

    /// Ticks left in the current slice
    pub fn slice_remaining(&self) -> u32 {
        self.slice_remaining
    }

    /// Returns the currently running process
    pub fn current(&self) -> Option<ProcessId> {
        self.current
    }

    /// Ready queue contents, head first
    pub fn queued(&self) -> Vec<ProcessId> {
        self.run_queue.queue.iter().copied().collect()
    }

    pub fn is_queued(&self, pid: ProcessId) -> bool {
        self.run_queue.contains(pid)
    }

    /// Returns the number of processes in the ready queue
    pub fn ready_count(&self) -> usize {
        self.run_queue.len()
    }

    /// Returns true if there are processes waiting to run
    pub fn has_ready(&self) -> bool {
        !self.run_queue.is_empty()
    }

    /// Returns the current scheduler tick count
    pub fn current_ticks(&self) -> u64 {
        self.current_ticks
    }

    /// Returns a reference to the audit log
    ///
    /// Used in tests to verify scheduling behavior.
    pub fn audit_log(&self) -> &[ScheduleEvent] {
        &self.audit_log
    }

    /// Clears the audit log
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
