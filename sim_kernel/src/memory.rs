//! Main memory
//!
//! A flat byte array. Every access names the partition window it is made
//! through and is rejected if it falls outside `[base, limit)`.

use thiserror::Error;

/// Memory access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Offset lies outside the window
    #[error("address {offset:#06x} is outside a window of {size} bytes")]
    AddressOutOfBounds { offset: usize, size: usize },

    /// Window does not fit in memory
    #[error("window {base:#06x}..{limit:#06x} does not fit in {memory_size} bytes of memory")]
    InvalidWindow {
        base: usize,
        limit: usize,
        memory_size: usize,
    },

    /// Data is larger than the window
    #[error("{size} bytes do not fit in a window of {capacity} bytes")]
    TooLarge { size: usize, capacity: usize },
}

/// A `[base, limit)` window onto memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub base: usize,
    pub limit: usize,
}

impl Bounds {
    pub const fn new(base: usize, limit: usize) -> Self {
        Self { base, limit }
    }

    pub fn len(&self) -> usize {
        self.limit.saturating_sub(self.base)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a window-relative offset is inside the window
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset < self.len()
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.base < other.limit && other.base < self.limit
    }
}

/// Main memory
#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Creates zeroed memory of the given size
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Reads one byte at a window-relative offset
    pub fn read(&self, window: Bounds, offset: usize) -> Result<u8, MemoryError> {
        let address = self.resolve(window, offset)?;
        Ok(self.bytes[address])
    }

    /// Writes one byte at a window-relative offset
    pub fn write(&mut self, window: Bounds, offset: usize, value: u8) -> Result<(), MemoryError> {
        let address = self.resolve(window, offset)?;
        self.bytes[address] = value;
        Ok(())
    }

    /// Returns the whole window
    pub fn read_range(&self, window: Bounds) -> Result<&[u8], MemoryError> {
        self.check_window(window)?;
        Ok(&self.bytes[window.base..window.limit])
    }

    /// Copies `data` to the start of the window
    pub fn write_range(&mut self, window: Bounds, data: &[u8]) -> Result<(), MemoryError> {
        self.check_window(window)?;
        if data.len() > window.len() {
            return Err(MemoryError::TooLarge {
                size: data.len(),
                capacity: window.len(),
            });
        }
        self.bytes[window.base..window.base + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Zeroes the whole window
    pub fn zero_range(&mut self, window: Bounds) -> Result<(), MemoryError> {
        self.check_window(window)?;
        self.bytes[window.base..window.limit].fill(0);
        Ok(())
    }

    fn check_window(&self, window: Bounds) -> Result<(), MemoryError> {
        if window.base > window.limit || window.limit > self.bytes.len() {
            return Err(MemoryError::InvalidWindow {
                base: window.base,
                limit: window.limit,
                memory_size: self.bytes.len(),
            });
        }
        Ok(())
    }

    fn resolve(&self, window: Bounds, offset: usize) -> Result<usize, MemoryError> {
        self.check_window(window)?;
        if !window.contains_offset(offset) {
            return Err(MemoryError::AddressOutOfBounds {
                offset,
                size: window.len(),
            });
        }
        Ok(window.base + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_within_window() {
        let mut memory = Memory::new(768);
        let window = Bounds::new(256, 512);

        memory.write(window, 0, 0xA9).unwrap();
        memory.write(window, 255, 0x01).unwrap();

        assert_eq!(memory.read(window, 0), Ok(0xA9));
        assert_eq!(memory.read(Bounds::new(0, 768), 256), Ok(0xA9));
        assert_eq!(memory.read(window, 255), Ok(0x01));
    }

    #[test]
    fn test_access_outside_window_rejected() {
        let mut memory = Memory::new(768);
        let window = Bounds::new(0, 256);

        assert_eq!(
            memory.read(window, 256),
            Err(MemoryError::AddressOutOfBounds {
                offset: 256,
                size: 256
            })
        );
        assert!(memory.write(window, 300, 1).is_err());
        // Neighbouring partition untouched
        assert_eq!(memory.read(Bounds::new(256, 512), 44), Ok(0));
    }

    #[test]
    fn test_window_outside_memory_rejected() {
        let memory = Memory::new(768);
        assert!(matches!(
            memory.read_range(Bounds::new(512, 1024)),
            Err(MemoryError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_range_operations() {
        let mut memory = Memory::new(16);
        let window = Bounds::new(4, 8);

        memory.write_range(window, &[1, 2, 3]).unwrap();
        assert_eq!(memory.read_range(window).unwrap(), &[1, 2, 3, 0]);

        assert_eq!(
            memory.write_range(window, &[0; 5]),
            Err(MemoryError::TooLarge {
                size: 5,
                capacity: 4
            })
        );

        memory.zero_range(window).unwrap();
        assert_eq!(memory.read_range(window).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_bounds_overlap() {
        let a = Bounds::new(0, 256);
        let b = Bounds::new(256, 512);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Bounds::new(255, 300)));
        assert_eq!(b.len(), 256);
    }
}
