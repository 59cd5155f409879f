//! # Kernel API
//!
//! This crate defines the interface between the host layer (shell, console,
//! hardware harness) and the simulated kernel core.
//!
//! ## Philosophy
//!
//! The kernel exposes **operations**, not internals:
//! - Program admission (load), scheduling (run, run-all), and termination (kill)
//! - Process inspection through snapshots, never through live references
//! - Disk file operations taking and returning names and bytes only
//! - A single clock tick that advances the machine by one instruction
//!
//! ## Design Goals
//!
//! 1. **Testability**: The entire API can be driven from `cargo test`
//! 2. **Explicitness**: Every failure is a typed [`KernelError`]
//! 3. **Determinism**: Same calls, same ticks, same results
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A command shell (text parsing is the host's job)
//! - A renderer (tables and scrolling are the host's job)
//! - A threaded runtime (the host calls `clock_tick` when it wants time to pass)

pub mod error;
pub mod kernel;
pub mod process;

pub use error::{ErrorKind, KernelError};
pub use kernel::{KernelApi, LoadReceipt, TickOutcome};
pub use process::{ExitReason, Location, ProcessSnapshot, ProcessState, Registers};
