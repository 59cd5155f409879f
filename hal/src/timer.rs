//! # Timer Device
//!
//! Hardware abstraction for the machine clock.
//!
//! ## Philosophy
//!
//! **Time is a service, not a global variable.**
//!
//! The clock is a monotonic tick counter. One tick is one CPU cycle: the
//! kernel executes at most one instruction per tick. The counter is also the
//! cycle count used for turnaround and wait accounting.
//!
//! ## Design Principles
//!
//! 1. **Monotonic**: Ticks never go backwards
//! 2. **Non-blocking**: Always returns immediately
//! 3. **Cumulative**: Returns total ticks since boot

/// Hardware timer device trait
///
/// # Examples
///
/// ```
/// use hal::TimerDevice;
///
/// fn elapsed<T: TimerDevice>(timer: &mut T, since: u64) -> u64 {
///     timer.poll_ticks() - since
/// }
/// ```
pub trait TimerDevice {
    /// Returns the current tick count
    ///
    /// This value is monotonic and counts ticks since boot.
    fn poll_ticks(&mut self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One tick per poll, like a free-running cycle counter
    struct CycleCounter(u64);

    impl TimerDevice for CycleCounter {
        fn poll_ticks(&mut self) -> u64 {
            self.0 += 1;
            self.0
        }
    }

    #[test]
    fn test_cycle_counter_never_goes_back() {
        let mut clock = CycleCounter(0);
        let readings: Vec<u64> = (0..5).map(|_| clock.poll_ticks()).collect();

        assert_eq!(readings, vec![1, 2, 3, 4, 5]);
        assert!(readings.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_generic_consumer() {
        fn cycles_since<T: TimerDevice>(timer: &mut T, since: u64) -> u64 {
            timer.poll_ticks() - since
        }

        let mut clock = CycleCounter(40);
        assert_eq!(cycles_since(&mut clock, 38), 3);
    }
}
