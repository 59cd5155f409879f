//! # Core Types
//!
//! This crate defines the fundamental types shared by every layer of the
//! simulator: the process identifier handed out at admission and the
//! three-coordinate disk address used by the drive and the file system.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: a pid and a block address cannot be confused
//!   with plain integers.
//! - **Plain data**: every type here is `Copy`, ordered, and serializable so it
//!   can cross the host boundary or land in a persisted disk image unchanged.
//!
//! ## Key Types
//!
//! - [`ProcessId`]: Monotonic process identifier
//! - [`Tsb`]: Track/sector/block disk address

pub mod address;
pub mod ids;

pub use address::{ParseTsbError, Tsb};
pub use ids::ProcessId;
