//! Chained-block file system
//!
//! Track 0 holds the master boot record at `0:0:0` followed by the directory,
//! one entry per block. Every other track is data. A file is a linked chain of
//! data blocks starting at its directory entry's pointer.
//!
//! ## Invariants
//!
//! - Every data block is either free (zeroed) or reachable from exactly one
//!   directory entry.
//! - Chains never share blocks and always end at `CHAIN_END`.
//! - A failed capacity check leaves the disk untouched.

use crate::block::{
    max_name_len, payload_len, BlockRecord, BootRecord, DirectoryEntry, CHAIN_END, HEADER_LEN,
    MBR_ADDRESS,
};
use core_types::Tsb;
use hal::{DiskDevice, DiskError, DiskGeometry};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Leading character of names reserved for swap files
pub const SWAP_PREFIX: char = '~';

/// Returns true if `name` is reserved for kernel swap files
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(SWAP_PREFIX)
}

/// File system errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileSystemError {
    #[error("Disk is not formatted")]
    NotFormatted,

    #[error("Unsupported disk geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("File already exists: {0:?}")]
    FileExists(String),

    #[error("File not found: {0:?}")]
    FileNotFound(String),

    #[error("Directory is full")]
    DirectoryFull,

    #[error("Disk is full: {needed} blocks needed, {available} available")]
    DiskFull { needed: usize, available: usize },

    #[error("Disk device error: {0}")]
    Device(#[from] DiskError),

    #[error("File system is corrupt: {0}")]
    Corrupt(String),
}

/// File system over a track/sector/block drive
pub struct DiskFileSystem<D: DiskDevice> {
    device: D,
    geometry: DiskGeometry,
    formatted: bool,
}

impl<D: DiskDevice> DiskFileSystem<D> {
    /// Mounts a drive
    ///
    /// A drive whose boot record carries the magic is mounted formatted;
    /// anything else is mounted unformatted and must be formatted before use.
    pub fn mount(mut device: D) -> Result<Self, FileSystemError> {
        let geometry = device.geometry();
        check_geometry(&geometry)?;

        let mut buffer = vec![0u8; geometry.block_size];
        device.read_block(MBR_ADDRESS, &mut buffer)?;
        let formatted = match BootRecord::from_record(&BlockRecord::decode(&buffer)) {
            Some(boot) if boot.geometry == geometry => true,
            Some(boot) => {
                return Err(FileSystemError::Corrupt(format!(
                    "boot record describes {}x{}x{} blocks of {} bytes",
                    boot.geometry.tracks,
                    boot.geometry.sectors,
                    boot.geometry.blocks,
                    boot.geometry.block_size
                )))
            }
            None => false,
        };

        Ok(Self {
            device,
            geometry,
            formatted,
        })
    }

    pub fn geometry(&self) -> DiskGeometry {
        self.geometry
    }

    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Longest accepted file name in bytes
    pub fn max_name_len(&self) -> usize {
        max_name_len(self.geometry.block_size)
    }

    /// Number of directory entries
    pub fn directory_capacity(&self) -> usize {
        self.geometry.blocks_per_track() - 1
    }

    /// Number of data blocks
    pub fn data_capacity(&self) -> usize {
        self.geometry.block_count() - self.geometry.blocks_per_track()
    }

    /// Formats the drive
    ///
    /// Every block is cleared and a fresh boot record is written. Formatting
    /// twice yields the same bytes as formatting once.
    pub fn format(&mut self) -> Result<(), FileSystemError> {
        let free = BlockRecord::free(self.geometry.block_size);
        for tsb in self.geometry.addresses().collect::<Vec<_>>() {
            self.write_record(tsb, &free)?;
        }
        let boot = BootRecord::new(self.geometry).to_record();
        self.write_record(MBR_ADDRESS, &boot)?;
        self.device.flush()?;
        self.formatted = true;
        Ok(())
    }

    /// Creates an empty file
    pub fn create(&mut self, name: &str) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;
        self.validate_name(name)?;

        let mut free_slot = None;
        for (slot, entry) in self.directory()? {
            match entry {
                Some(entry) if entry.name == name => {
                    return Err(FileSystemError::FileExists(name.to_string()))
                }
                None if free_slot.is_none() => free_slot = Some(slot),
                _ => {}
            }
        }

        let slot = free_slot.ok_or(FileSystemError::DirectoryFull)?;
        let record = DirectoryEntry::new(name).to_record(self.geometry.block_size);
        self.write_record(slot, &record)
    }

    /// Replaces the contents of a file
    ///
    /// The file's existing chain is reused first; extra blocks come from the
    /// lowest free data blocks and surplus blocks are released.
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;
        let (slot, mut entry) = self.require(name)?;

        let needed = self.blocks_needed(data.len());
        let existing: Vec<Tsb> = self
            .walk_chain(entry.first)?
            .into_iter()
            .map(|(tsb, _)| tsb)
            .collect();
        let free = self.free_data_list()?;
        let available = existing.len() + free.len();
        let length = u16::try_from(data.len()).ok().filter(|_| needed <= available);
        let Some(length) = length else {
            return Err(FileSystemError::DiskFull { needed, available });
        };

        let chain: Vec<Tsb> = existing
            .iter()
            .chain(free.iter())
            .copied()
            .take(needed)
            .collect();

        let block_size = self.geometry.block_size;
        let chunk = payload_len(block_size);
        for (i, tsb) in chain.iter().enumerate() {
            let next = chain.get(i + 1).copied().unwrap_or(CHAIN_END);
            let start = i * chunk;
            let end = (start + chunk).min(data.len());
            self.write_record(*tsb, &BlockRecord::used(block_size, next, &data[start..end]))?;
        }

        let surplus = BlockRecord::free(block_size);
        for tsb in existing.iter().skip(needed) {
            self.write_record(*tsb, &surplus)?;
        }

        entry.first = chain.first().copied().unwrap_or(CHAIN_END);
        entry.length = length;
        self.write_record(slot, &entry.to_record(block_size))?;
        self.device.flush()?;
        Ok(())
    }

    /// Reads a whole file
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, FileSystemError> {
        self.ensure_formatted()?;
        let (_, entry) = self.require(name)?;

        let mut data = Vec::with_capacity(entry.length as usize);
        for (_, record) in self.walk_chain(entry.first)? {
            data.extend_from_slice(&record.payload);
        }

        let length = entry.length as usize;
        if data.len() < length {
            return Err(FileSystemError::Corrupt(format!(
                "file {:?} records {} bytes but its chain holds {}",
                name,
                length,
                data.len()
            )));
        }
        data.truncate(length);
        Ok(data)
    }

    /// Deletes a file and releases its blocks
    pub fn delete(&mut self, name: &str) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;
        let (slot, entry) = self.require(name)?;

        let free = BlockRecord::free(self.geometry.block_size);
        for (tsb, _) in self.walk_chain(entry.first)? {
            self.write_record(tsb, &free)?;
        }
        self.write_record(slot, &free)?;
        self.device.flush()?;
        Ok(())
    }

    /// Copies a file to a new name
    pub fn copy(&mut self, from: &str, to: &str) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;
        self.validate_name(to)?;
        let data = self.read(from)?;

        if self.find(to)?.is_some() {
            return Err(FileSystemError::FileExists(to.to_string()));
        }
        let needed = self.blocks_needed(data.len());
        let available = self.free_data_blocks()?;
        if needed > available {
            return Err(FileSystemError::DiskFull { needed, available });
        }

        self.create(to)?;
        if let Err(err) = self.write(to, &data) {
            self.delete(to)?;
            return Err(err);
        }
        Ok(())
    }

    /// Renames a file
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;
        self.validate_name(to)?;
        let (slot, mut entry) = self.require(from)?;

        if self.find(to)?.is_some() {
            return Err(FileSystemError::FileExists(to.to_string()));
        }

        entry.name = to.to_string();
        self.write_record(slot, &entry.to_record(self.geometry.block_size))?;
        self.device.flush()?;
        Ok(())
    }

    /// Lists user-visible file names in directory order
    pub fn list(&mut self) -> Result<Vec<String>, FileSystemError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| !is_reserved_name(&entry.name))
            .map(|entry| entry.name)
            .collect())
    }

    /// Every directory entry, swap files included
    pub fn entries(&mut self) -> Result<Vec<DirectoryEntry>, FileSystemError> {
        self.ensure_formatted()?;
        Ok(self
            .directory()?
            .into_iter()
            .filter_map(|(_, entry)| entry)
            .collect())
    }

    pub fn exists(&mut self, name: &str) -> Result<bool, FileSystemError> {
        self.ensure_formatted()?;
        Ok(self.find(name)?.is_some())
    }

    /// Blocks holding a file, in chain order
    pub fn chain_of(&mut self, name: &str) -> Result<Vec<Tsb>, FileSystemError> {
        self.ensure_formatted()?;
        let (_, entry) = self.require(name)?;
        Ok(self
            .walk_chain(entry.first)?
            .into_iter()
            .map(|(tsb, _)| tsb)
            .collect())
    }

    /// Number of unallocated data blocks
    pub fn free_data_blocks(&mut self) -> Result<usize, FileSystemError> {
        self.ensure_formatted()?;
        Ok(self.free_data_list()?.len())
    }

    /// Checks the block invariants across the whole disk
    ///
    /// Every in-use data block must belong to exactly one chain and every
    /// free data block must be zeroed.
    pub fn verify(&mut self) -> Result<(), FileSystemError> {
        self.ensure_formatted()?;

        let mut owners: BTreeMap<Tsb, String> = BTreeMap::new();
        for entry in self.entries()? {
            for (tsb, _) in self.walk_chain(entry.first)? {
                if let Some(other) = owners.insert(tsb, entry.name.clone()) {
                    return Err(FileSystemError::Corrupt(format!(
                        "block {} is shared by {:?} and {:?}",
                        tsb, other, entry.name
                    )));
                }
            }
        }

        for tsb in self.data_slots() {
            let record = self.read_record(tsb)?;
            let owned = owners.contains_key(&tsb);
            if record.in_use && !owned {
                return Err(FileSystemError::Corrupt(format!(
                    "block {} is in use but unreachable",
                    tsb
                )));
            }
            if !record.in_use && !record.is_clear() {
                return Err(FileSystemError::Corrupt(format!(
                    "free block {} is not cleared",
                    tsb
                )));
            }
        }
        Ok(())
    }

    fn ensure_formatted(&self) -> Result<(), FileSystemError> {
        if self.formatted {
            Ok(())
        } else {
            Err(FileSystemError::NotFormatted)
        }
    }

    fn validate_name(&self, name: &str) -> Result<(), FileSystemError> {
        if name.is_empty() || name.len() > self.max_name_len() || name.contains('\0') {
            return Err(FileSystemError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn blocks_needed(&self, len: usize) -> usize {
        len.div_ceil(payload_len(self.geometry.block_size))
    }

    fn directory_slots(&self) -> Vec<Tsb> {
        (1..self.geometry.blocks_per_track())
            .filter_map(|index| self.geometry.tsb_at(index))
            .collect()
    }

    fn data_slots(&self) -> Vec<Tsb> {
        (self.geometry.blocks_per_track()..self.geometry.block_count())
            .filter_map(|index| self.geometry.tsb_at(index))
            .collect()
    }

    fn is_data_block(&self, tsb: Tsb) -> bool {
        tsb.track > 0 && self.geometry.contains(tsb)
    }

    fn directory(&mut self) -> Result<Vec<(Tsb, Option<DirectoryEntry>)>, FileSystemError> {
        let mut slots = Vec::with_capacity(self.directory_capacity());
        for tsb in self.directory_slots() {
            let record = self.read_record(tsb)?;
            if !record.in_use {
                slots.push((tsb, None));
                continue;
            }
            let entry = DirectoryEntry::from_record(&record).ok_or_else(|| {
                FileSystemError::Corrupt(format!("directory entry {} is unreadable", tsb))
            })?;
            slots.push((tsb, Some(entry)));
        }
        Ok(slots)
    }

    fn find(&mut self, name: &str) -> Result<Option<(Tsb, DirectoryEntry)>, FileSystemError> {
        Ok(self
            .directory()?
            .into_iter()
            .find_map(|(slot, entry)| entry.filter(|e| e.name == name).map(|e| (slot, e))))
    }

    fn require(&mut self, name: &str) -> Result<(Tsb, DirectoryEntry), FileSystemError> {
        self.find(name)?
            .ok_or_else(|| FileSystemError::FileNotFound(name.to_string()))
    }

    fn walk_chain(&mut self, first: Tsb) -> Result<Vec<(Tsb, BlockRecord)>, FileSystemError> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = first;

        while current != CHAIN_END {
            if !self.is_data_block(current) {
                return Err(FileSystemError::Corrupt(format!(
                    "chain leaves the data area at {}",
                    current
                )));
            }
            if !seen.insert(current) {
                return Err(FileSystemError::Corrupt(format!(
                    "chain loops back to {}",
                    current
                )));
            }
            let record = self.read_record(current)?;
            if !record.in_use {
                return Err(FileSystemError::Corrupt(format!(
                    "chain reaches free block {}",
                    current
                )));
            }
            let next = record.next;
            chain.push((current, record));
            current = next;
        }
        Ok(chain)
    }

    fn free_data_list(&mut self) -> Result<Vec<Tsb>, FileSystemError> {
        let mut free = Vec::new();
        for tsb in self.data_slots() {
            if !self.read_record(tsb)?.in_use {
                free.push(tsb);
            }
        }
        Ok(free)
    }

    fn read_record(&mut self, tsb: Tsb) -> Result<BlockRecord, FileSystemError> {
        let mut buffer = vec![0u8; self.geometry.block_size];
        self.device.read_block(tsb, &mut buffer)?;
        Ok(BlockRecord::decode(&buffer))
    }

    fn write_record(&mut self, tsb: Tsb, record: &BlockRecord) -> Result<(), FileSystemError> {
        let bytes = record.encode(self.geometry.block_size);
        self.device.write_block(tsb, &bytes)?;
        Ok(())
    }
}

fn check_geometry(geometry: &DiskGeometry) -> Result<(), FileSystemError> {
    let unsupported = |reason: &str| -> Result<(), FileSystemError> {
        Err(FileSystemError::UnsupportedGeometry(reason.to_string()))
    };

    if geometry.tracks < 2 {
        return unsupported("at least two tracks are required");
    }
    if geometry.blocks_per_track() < 2 {
        return unsupported("track 0 must hold at least one directory entry");
    }
    if geometry.block_size < HEADER_LEN + BootRecord::ENCODED_LEN
        || geometry.block_size > u16::MAX as usize
    {
        return unsupported("block size cannot hold the boot record");
    }
    let data_blocks = geometry.block_count() - geometry.blocks_per_track();
    if data_blocks * payload_len(geometry.block_size) > u16::MAX as usize {
        return unsupported("data area exceeds the largest file length");
    }
    Ok(())
}
