//! Disk device abstraction
//!
//! Provides a minimal fixed-geometry drive: blocks are addressed by
//! (track, sector, block) and always read or written whole.

use core_types::Tsb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Disk device errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiskError {
    /// Address outside the drive geometry
    #[error("block address {0} is outside the disk geometry")]
    OutOfBounds(Tsb),

    /// Buffer does not match the block size
    #[error("buffer of {actual} bytes does not match block size {expected}")]
    InvalidSize { expected: usize, actual: usize },

    /// I/O error (backing store failure)
    #[error("I/O error")]
    IoError,
}

/// Physical layout of a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskGeometry {
    pub tracks: u8,
    pub sectors: u8,
    pub blocks: u8,
    /// Bytes per block
    pub block_size: usize,
}

impl DiskGeometry {
    /// Four tracks of eight sectors of eight 64-byte blocks
    pub const fn standard() -> Self {
        Self {
            tracks: 4,
            sectors: 8,
            blocks: 8,
            block_size: 64,
        }
    }

    /// Total number of blocks on the drive
    pub fn block_count(&self) -> usize {
        self.tracks as usize * self.sectors as usize * self.blocks as usize
    }

    /// Number of blocks in a single track
    pub fn blocks_per_track(&self) -> usize {
        self.sectors as usize * self.blocks as usize
    }

    /// Returns true if the address exists on this drive
    pub fn contains(&self, tsb: Tsb) -> bool {
        tsb.track < self.tracks && tsb.sector < self.sectors && tsb.block < self.blocks
    }

    /// Flattens an address into a linear block index
    pub fn index_of(&self, tsb: Tsb) -> Option<usize> {
        if !self.contains(tsb) {
            return None;
        }
        Some(
            tsb.track as usize * self.blocks_per_track()
                + tsb.sector as usize * self.blocks as usize
                + tsb.block as usize,
        )
    }

    /// Expands a linear block index back into an address
    pub fn tsb_at(&self, index: usize) -> Option<Tsb> {
        if index >= self.block_count() {
            return None;
        }
        let track = index / self.blocks_per_track();
        let rest = index % self.blocks_per_track();
        Some(Tsb::new(
            track as u8,
            (rest / self.blocks as usize) as u8,
            (rest % self.blocks as usize) as u8,
        ))
    }

    /// Iterates every address in track, sector, block order
    pub fn addresses(&self) -> impl Iterator<Item = Tsb> + '_ {
        (0..self.block_count()).filter_map(move |index| self.tsb_at(index))
    }
}

impl Default for DiskGeometry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Disk device trait
///
/// Implementers provide whole-block read/write operations. The device
/// never interprets block contents.
pub trait DiskDevice {
    /// Returns the drive geometry
    fn geometry(&self) -> DiskGeometry;

    /// Reads a block into the provided buffer
    ///
    /// # Errors
    /// Returns `DiskError::OutOfBounds` if the address is not on the drive
    /// Returns `DiskError::InvalidSize` if the buffer is not exactly one block
    fn read_block(&mut self, tsb: Tsb, buffer: &mut [u8]) -> Result<(), DiskError>;

    /// Writes a block from the provided buffer
    ///
    /// # Errors
    /// Returns `DiskError::OutOfBounds` if the address is not on the drive
    /// Returns `DiskError::InvalidSize` if the buffer is not exactly one block
    fn write_block(&mut self, tsb: Tsb, buffer: &[u8]) -> Result<(), DiskError>;

    /// Flush any pending writes to the backing store
    fn flush(&mut self) -> Result<(), DiskError> {
        Ok(())
    }
}

/// RAM disk - an in-memory drive
///
/// Blocks live in a flat arena indexed by the flattened address.
/// Data is lost when the disk is dropped unless captured into an image.
#[derive(Debug, Clone)]
pub struct RamDisk {
    geometry: DiskGeometry,
    blocks: Vec<Vec<u8>>,
}

impl RamDisk {
    /// Creates a zero-filled RAM disk with the given geometry
    pub fn new(geometry: DiskGeometry) -> Self {
        Self {
            geometry,
            blocks: vec![vec![0u8; geometry.block_size]; geometry.block_count()],
        }
    }

    /// Creates a RAM disk with the standard geometry
    pub fn standard() -> Self {
        Self::new(DiskGeometry::standard())
    }

    fn slot(&self, tsb: Tsb, len: usize) -> Result<usize, DiskError> {
        let index = self
            .geometry
            .index_of(tsb)
            .ok_or(DiskError::OutOfBounds(tsb))?;
        if len != self.geometry.block_size {
            return Err(DiskError::InvalidSize {
                expected: self.geometry.block_size,
                actual: len,
            });
        }
        Ok(index)
    }
}

impl DiskDevice for RamDisk {
    fn geometry(&self) -> DiskGeometry {
        self.geometry
    }

    fn read_block(&mut self, tsb: Tsb, buffer: &mut [u8]) -> Result<(), DiskError> {
        let index = self.slot(tsb, buffer.len())?;
        buffer.copy_from_slice(&self.blocks[index]);
        Ok(())
    }

    fn write_block(&mut self, tsb: Tsb, buffer: &[u8]) -> Result<(), DiskError> {
        let index = self.slot(tsb, buffer.len())?;
        self.blocks[index].copy_from_slice(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_geometry() {
        let geometry = DiskGeometry::standard();
        assert_eq!(geometry.block_count(), 256);
        assert_eq!(geometry.blocks_per_track(), 64);
    }

    #[test]
    fn test_index_round_trip() {
        let geometry = DiskGeometry::standard();
        for index in 0..geometry.block_count() {
            let tsb = geometry.tsb_at(index).unwrap();
            assert_eq!(geometry.index_of(tsb), Some(index));
        }
        assert_eq!(geometry.tsb_at(256), None);
        assert_eq!(geometry.index_of(Tsb::new(4, 0, 0)), None);
    }

    #[test]
    fn test_addresses_in_directory_order() {
        let geometry = DiskGeometry::standard();
        let addresses: Vec<Tsb> = geometry.addresses().take(10).collect();
        assert_eq!(addresses[0], Tsb::new(0, 0, 0));
        assert_eq!(addresses[7], Tsb::new(0, 0, 7));
        assert_eq!(addresses[8], Tsb::new(0, 1, 0));
    }

    #[test]
    fn test_ramdisk_read_write() {
        let mut disk = RamDisk::standard();
        let tsb = Tsb::new(2, 3, 4);

        let write_data = [0x42u8; 64];
        disk.write_block(tsb, &write_data).unwrap();

        let mut read_data = [0u8; 64];
        disk.read_block(tsb, &mut read_data).unwrap();
        assert_eq!(write_data, read_data);

        // Neighbouring blocks are untouched
        disk.read_block(Tsb::new(2, 3, 5), &mut read_data).unwrap();
        assert_eq!(read_data, [0u8; 64]);
    }

    #[test]
    fn test_ramdisk_out_of_bounds() {
        let mut disk = RamDisk::standard();
        let mut buffer = [0u8; 64];
        let bad = Tsb::new(0, 8, 0);

        assert_eq!(
            disk.read_block(bad, &mut buffer),
            Err(DiskError::OutOfBounds(bad))
        );
        assert_eq!(disk.write_block(bad, &buffer), Err(DiskError::OutOfBounds(bad)));
    }

    #[test]
    fn test_ramdisk_invalid_size() {
        let mut disk = RamDisk::standard();
        let mut small_buffer = [0u8; 10];

        assert_eq!(
            disk.read_block(Tsb::new(0, 0, 0), &mut small_buffer),
            Err(DiskError::InvalidSize {
                expected: 64,
                actual: 10
            })
        );
    }
}
