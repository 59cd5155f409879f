//! # Simulated Clock
//!
//! Deterministic pulse source for driving the kernel.
//!
//! ## Philosophy
//!
//! **Determinism enables thorough testing.**
//!
//! The clock only advances when told to. The host asks it how many pulses
//! are pending and delivers each one to the kernel as a clock tick, so the
//! same pulses always produce the same run.

use hal::TimerDevice;

/// Simulated timer device with controllable time progression
///
/// # Examples
///
/// ```
/// use sim_kernel::timer::SimTimerDevice;
/// use hal::TimerDevice;
///
/// let mut timer = SimTimerDevice::new();
/// assert_eq!(timer.poll_ticks(), 0);
///
/// timer.advance_ticks(100);
/// assert_eq!(timer.poll_ticks(), 100);
///
/// timer.advance_ticks(50);
/// assert_eq!(timer.poll_ticks(), 150);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimTimerDevice {
    ticks: u64,
    delivered: u64,
}

impl SimTimerDevice {
    /// Creates a new simulated timer starting at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a timer whose first pulses are already pending
    pub fn with_initial_ticks(ticks: u64) -> Self {
        Self {
            ticks,
            delivered: 0,
        }
    }

    /// Advances the timer by the specified number of ticks
    pub fn advance_ticks(&mut self, delta: u64) {
        self.ticks = self.ticks.saturating_add(delta);
    }

    /// Returns the current tick count without advancing time
    pub fn current_ticks(&self) -> u64 {
        self.ticks
    }

    /// Pulses generated but not yet handed out by `take_pending`
    pub fn pending(&self) -> u64 {
        self.ticks - self.delivered
    }

    /// Hands out all pending pulses
    pub fn take_pending(&mut self) -> u64 {
        let pending = self.pending();
        self.delivered = self.ticks;
        pending
    }
}

impl TimerDevice for SimTimerDevice {
    fn poll_ticks(&mut self) -> u64 {
        self.ticks
    }
}
