//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the simulated machine's devices as traits.
//!
//! ## Philosophy
//!
//! **Devices are dumb; the kernel is smart.**
//!
//! Nothing here knows about processes, partitions, or files. The drive moves
//! fixed-size blocks, the timer counts ticks, and the console accepts text.
//! Interpretation of the bytes belongs to the kernel and its services.
//!
//! ## Design Principles
//!
//! 1. **Trait-based**: All device access goes through traits
//! 2. **Deterministic**: Simulated devices only change when told to
//! 3. **Testable**: Every device has an in-memory implementation

pub mod console;
pub mod disk;
pub mod timer;

pub use console::{BufferedConsole, ConsoleDevice};
pub use disk::{DiskDevice, DiskError, DiskGeometry, RamDisk};
pub use timer::TimerDevice;
