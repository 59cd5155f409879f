//! # Simulator Host Runtime
//!
//! This crate provides the headless host for the simulated kernel.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: the kernel never prints, the host drains its console
//! - **Time is explicit**: the host pulls pulses from a timer and delivers
//!   each one as a clock tick
//! - **Deterministic by default**: the same programs and flags produce the
//!   same run, so the host is usable from tests
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Boots the kernel on a fresh RAM disk or a persisted disk image
//! - Formats the disk and admits hex programs on request
//! - Drives the clock until the CPU goes idle or a tick limit is reached
//! - Renders console output, the process table and the trace log
//! - Saves the disk image on shutdown
//!
//! ## Non-Responsibilities
//!
//! The host does NOT:
//! - Provide an interactive shell
//! - Emulate a terminal
//! - Reach into kernel internals beyond the kernel API and read-only views

pub mod runtime;
pub mod table;

pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError, RunSummary};
pub use table::render_process_table;
