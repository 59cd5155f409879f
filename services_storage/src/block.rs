//! On-disk block records
//!
//! Every block begins with a four byte header followed by the payload:
//!
//! ```text
//! byte 0      in-use flag (0 or 1)
//! bytes 1..4  next block address (track, sector, block)
//! bytes 4..   payload
//! ```
//!
//! The address `0:0:0` is the master boot record and never part of a file,
//! so it doubles as the end-of-chain marker. A zeroed block is therefore a
//! free block.

use core_types::Tsb;
use hal::DiskGeometry;

/// Header bytes in front of every payload
pub const HEADER_LEN: usize = 4;

/// End-of-chain marker
pub const CHAIN_END: Tsb = Tsb::new(0, 0, 0);

/// Address of the master boot record
pub const MBR_ADDRESS: Tsb = Tsb::new(0, 0, 0);

/// Magic bytes identifying a formatted disk
pub const MAGIC: &[u8; 8] = b"PSOSFS01";

/// Bytes taken by the file length in a directory payload
const LENGTH_LEN: usize = 2;

/// Decoded block record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub in_use: bool,
    pub next: Tsb,
    pub payload: Vec<u8>,
}

impl BlockRecord {
    /// A free block for the given block size
    pub fn free(block_size: usize) -> Self {
        Self {
            in_use: false,
            next: CHAIN_END,
            payload: vec![0; payload_len(block_size)],
        }
    }

    /// An in-use block whose payload is `data` zero-padded to capacity
    pub fn used(block_size: usize, next: Tsb, data: &[u8]) -> Self {
        let mut payload = vec![0; payload_len(block_size)];
        let len = data.len().min(payload.len());
        payload[..len].copy_from_slice(&data[..len]);
        Self {
            in_use: true,
            next,
            payload,
        }
    }

    /// Decodes a raw block
    pub fn decode(bytes: &[u8]) -> Self {
        if bytes.len() < HEADER_LEN {
            return Self {
                in_use: false,
                next: CHAIN_END,
                payload: Vec::new(),
            };
        }
        Self {
            in_use: bytes[0] != 0,
            next: Tsb::from_bytes([bytes[1], bytes[2], bytes[3]]),
            payload: bytes[HEADER_LEN..].to_vec(),
        }
    }

    /// Encodes into a raw block of exactly `block_size` bytes
    pub fn encode(&self, block_size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; block_size];
        if block_size < HEADER_LEN {
            return bytes;
        }
        bytes[0] = u8::from(self.in_use);
        bytes[1..HEADER_LEN].copy_from_slice(&self.next.to_bytes());
        let len = self.payload.len().min(block_size - HEADER_LEN);
        bytes[HEADER_LEN..HEADER_LEN + len].copy_from_slice(&self.payload[..len]);
        bytes
    }

    /// Returns true if this is a free block in canonical form
    pub fn is_clear(&self) -> bool {
        !self.in_use && self.next == CHAIN_END && self.payload.iter().all(|b| *b == 0)
    }
}

/// Payload bytes per block
pub fn payload_len(block_size: usize) -> usize {
    block_size.saturating_sub(HEADER_LEN)
}

/// Longest file name a directory entry can hold
pub fn max_name_len(block_size: usize) -> usize {
    payload_len(block_size).saturating_sub(LENGTH_LEN)
}

/// Master boot record contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootRecord {
    pub geometry: DiskGeometry,
}

impl BootRecord {
    /// Serialized size of the boot record payload
    pub const ENCODED_LEN: usize = MAGIC.len() + 5;

    pub fn new(geometry: DiskGeometry) -> Self {
        Self { geometry }
    }

    /// Encodes as an in-use block record
    pub fn to_record(&self) -> BlockRecord {
        let mut data = Vec::with_capacity(Self::ENCODED_LEN);
        data.extend_from_slice(MAGIC);
        data.push(self.geometry.tracks);
        data.push(self.geometry.sectors);
        data.push(self.geometry.blocks);
        data.extend_from_slice(&(self.geometry.block_size as u16).to_le_bytes());
        BlockRecord::used(self.geometry.block_size, CHAIN_END, &data)
    }

    /// Decodes a block record, returning `None` if it lacks the magic
    pub fn from_record(record: &BlockRecord) -> Option<Self> {
        let payload = &record.payload;
        if !record.in_use || payload.len() < Self::ENCODED_LEN || &payload[..MAGIC.len()] != MAGIC
        {
            return None;
        }
        let rest = &payload[MAGIC.len()..];
        Some(Self {
            geometry: DiskGeometry {
                tracks: rest[0],
                sectors: rest[1],
                blocks: rest[2],
                block_size: u16::from_le_bytes([rest[3], rest[4]]) as usize,
            },
        })
    }
}

/// Directory entry stored on track 0
///
/// The payload holds the file length (u16, little endian) followed by the
/// NUL-padded UTF-8 name. The header's next pointer holds the first data
/// block, or `CHAIN_END` for an empty file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub length: u16,
    pub first: Tsb,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: 0,
            first: CHAIN_END,
        }
    }

    pub fn to_record(&self, block_size: usize) -> BlockRecord {
        let mut data = Vec::with_capacity(LENGTH_LEN + self.name.len());
        data.extend_from_slice(&self.length.to_le_bytes());
        data.extend_from_slice(self.name.as_bytes());
        BlockRecord::used(block_size, self.first, &data)
    }

    /// Decodes an in-use directory record
    ///
    /// Returns `None` for free slots and for payloads that do not hold a
    /// valid name.
    pub fn from_record(record: &BlockRecord) -> Option<Self> {
        if !record.in_use || record.payload.len() < LENGTH_LEN {
            return None;
        }
        let length = u16::from_le_bytes([record.payload[0], record.payload[1]]);
        let raw = &record.payload[LENGTH_LEN..];
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let name = std::str::from_utf8(&raw[..end]).ok()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            length,
            first: record.next,
        })
    }
}
