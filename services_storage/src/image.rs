//! Disk image persistence
//!
//! A disk image is the whole drive captured as one record per block, keyed by
//! its `t:s:b` address. Records keep the block's in-use flag, its next
//! pointer and its payload (hex encoded). The image does not interpret file
//! system structure; it only stores and restores records.
//!
//! Images are written as JSON with a CRC32 over the geometry and records, so
//! a truncated or hand-edited file is rejected on load.

use crate::block::{payload_len, BlockRecord};
use core_types::Tsb;
use hal::{DiskDevice, DiskError, DiskGeometry, RamDisk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Disk image errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed image: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected:08x}, computed {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Invalid block key: {0}")]
    InvalidKey(String),

    #[error("Invalid record at {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("Disk device error: {0}")]
    Device(#[from] DiskError),
}

/// One persisted block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockImage {
    pub in_use: bool,
    /// Next pointer in `t:s:b` form
    pub next: String,
    /// Payload bytes, hex encoded
    pub payload: String,
}

/// Snapshot of a whole drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskImage {
    pub geometry: DiskGeometry,
    pub blocks: BTreeMap<String, BlockImage>,
    pub checksum: u32,
}

impl DiskImage {
    /// Reads every block of a device into an image
    pub fn capture<D: DiskDevice>(device: &mut D) -> Result<Self, ImageError> {
        let geometry = device.geometry();
        let mut buffer = vec![0u8; geometry.block_size];
        let mut blocks = BTreeMap::new();

        for tsb in geometry.addresses() {
            device.read_block(tsb, &mut buffer)?;
            let record = BlockRecord::decode(&buffer);
            blocks.insert(
                tsb.to_string(),
                BlockImage {
                    in_use: record.in_use,
                    next: record.next.to_string(),
                    payload: hex::encode(&record.payload),
                },
            );
        }

        let checksum = compute_checksum(&geometry, &blocks)?;
        Ok(Self {
            geometry,
            blocks,
            checksum,
        })
    }

    /// Rebuilds a RAM disk from the image
    ///
    /// Blocks missing from the image are left zeroed, i.e. free.
    pub fn restore(&self) -> Result<RamDisk, ImageError> {
        self.verify()?;

        let mut disk = RamDisk::new(self.geometry);
        let block_size = self.geometry.block_size;
        for (key, block) in &self.blocks {
            let tsb: Tsb = key
                .parse()
                .map_err(|_| ImageError::InvalidKey(key.clone()))?;
            if !self.geometry.contains(tsb) {
                return Err(ImageError::InvalidKey(key.clone()));
            }

            let invalid = |reason: String| ImageError::InvalidRecord {
                key: key.clone(),
                reason,
            };
            let next: Tsb = block
                .next
                .parse()
                .map_err(|_| invalid(format!("bad next pointer {:?}", block.next)))?;
            let payload = hex::decode(&block.payload).map_err(|e| invalid(e.to_string()))?;
            if payload.len() != payload_len(block_size) {
                return Err(invalid(format!(
                    "payload is {} bytes, expected {}",
                    payload.len(),
                    payload_len(block_size)
                )));
            }

            let record = BlockRecord {
                in_use: block.in_use,
                next,
                payload,
            };
            disk.write_block(tsb, &record.encode(block_size))?;
        }
        Ok(disk)
    }

    /// Checks the stored checksum against the contents
    pub fn verify(&self) -> Result<(), ImageError> {
        let actual = compute_checksum(&self.geometry, &self.blocks)?;
        if actual != self.checksum {
            return Err(ImageError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// Writes the image to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reads and verifies an image from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let json = std::fs::read_to_string(path)?;
        let image: Self = serde_json::from_str(&json)?;
        image.verify()?;
        Ok(image)
    }
}

fn compute_checksum(
    geometry: &DiskGeometry,
    blocks: &BTreeMap<String, BlockImage>,
) -> Result<u32, ImageError> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&serde_json::to_vec(geometry)?);
    hasher.update(&serde_json::to_vec(blocks)?);
    Ok(hasher.finalize())
}
