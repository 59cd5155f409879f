//! Track/sector/block disk addresses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address of a single disk block
///
/// Blocks on the simulated drive are addressed by the physical triple
/// (track, sector, block). The textual form `t:s:b` is the key under which
/// a block record is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tsb {
    pub track: u8,
    pub sector: u8,
    pub block: u8,
}

impl Tsb {
    /// Creates a new block address
    pub const fn new(track: u8, sector: u8, block: u8) -> Self {
        Self {
            track,
            sector,
            block,
        }
    }

    /// Returns the address as a `[track, sector, block]` byte triple
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.track, self.sector, self.block]
    }

    /// Builds an address from a `[track, sector, block]` byte triple
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Display for Tsb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.track, self.sector, self.block)
    }
}

/// Error returned when a `t:s:b` key cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid block address: {0}")]
pub struct ParseTsbError(pub String);

impl FromStr for Tsb {
    type Err = ParseTsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let mut next = || -> Result<u8, ParseTsbError> {
            parts
                .next()
                .and_then(|part| part.trim().parse::<u8>().ok())
                .ok_or_else(|| ParseTsbError(s.to_string()))
        };

        let track = next()?;
        let sector = next()?;
        let block = next()?;

        if parts.next().is_some() {
            return Err(ParseTsbError(s.to_string()));
        }

        Ok(Self::new(track, sector, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsb_display_and_parse() {
        let tsb = Tsb::new(1, 7, 3);
        let key = tsb.to_string();
        assert_eq!(key, "1:7:3");
        assert_eq!(key.parse::<Tsb>(), Ok(tsb));
    }

    #[test]
    fn test_tsb_parse_rejects_malformed_keys() {
        assert!("1:2".parse::<Tsb>().is_err());
        assert!("1:2:3:4".parse::<Tsb>().is_err());
        assert!("a:b:c".parse::<Tsb>().is_err());
        assert!("1:2:300".parse::<Tsb>().is_err());
    }

    #[test]
    fn test_tsb_byte_triple() {
        let tsb = Tsb::new(3, 0, 5);
        assert_eq!(Tsb::from_bytes(tsb.to_bytes()), tsb);
    }

    #[test]
    fn test_tsb_orders_by_track_then_sector_then_block() {
        assert!(Tsb::new(0, 7, 7) < Tsb::new(1, 0, 0));
        assert!(Tsb::new(1, 0, 7) < Tsb::new(1, 1, 0));
    }
}
