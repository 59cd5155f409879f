//! # Storage Service
//!
//! This crate implements the simulator's disk file system.
//!
//! ## Philosophy
//!
//! The drive is an arena of fixed-size block records addressed by
//! (track, sector, block). Files are flat, named, and stored as linked chains
//! of blocks. All structure lives on the disk itself, so mounting a persisted
//! image recovers every file without side tables.
//!
//! ## Design
//!
//! - **block**: the record codec (in-use flag, next pointer, payload)
//! - **DiskFileSystem**: directory on track 0, data chains on the other tracks
//! - **DiskImage**: whole-drive snapshot keyed by `t:s:b`, checksummed
//! - **FailingDisk**: fault-injecting device for tests

pub mod block;
pub mod failing_device;
pub mod file_system;
pub mod image;

pub use block::{BlockRecord, DirectoryEntry, CHAIN_END, MAGIC};
pub use failing_device::{FailingDisk, FailurePolicy};
pub use file_system::{is_reserved_name, DiskFileSystem, FileSystemError, SWAP_PREFIX};
pub use image::{BlockImage, DiskImage, ImageError};
