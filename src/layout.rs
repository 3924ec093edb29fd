//! Static register maps supplied by board drivers.
//!
//! Layouts are `'static` tables: every driver instance references them and
//! copies only the byte values into its own shadow cache.

use crate::{
    error::{Error, Result},
    types::{Direction, FlagNames},
};

/// Flag tables of one region, one entry per byte offset.
///
/// Tables may be shorter than the region; offsets beyond a table have no
/// named bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub inputs: &'static [FlagNames],
    pub outputs: &'static [FlagNames],
}

impl RegionLayout {
    /// Region with no named bits in either direction.
    pub const EMPTY: RegionLayout = RegionLayout {
        inputs: &[],
        outputs: &[],
    };

    pub const fn new(inputs: &'static [FlagNames], outputs: &'static [FlagNames]) -> Self {
        Self { inputs, outputs }
    }

    pub fn table(&self, direction: Direction) -> &'static [FlagNames] {
        match direction {
            Direction::In => self.inputs,
            Direction::Out => self.outputs,
        }
    }
}

/// Where a board reports its rotary-switch board id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardIdLocation {
    pub region: usize,
    pub offset: u64,
    /// Bits of the byte that carry the id.
    pub mask: u8,
}

impl BoardIdLocation {
    /// Low nibble (BID0..BID3) of the byte at `offset`.
    pub const fn low_nibble(region: usize, offset: u64) -> Self {
        Self {
            region,
            offset,
            mask: 0x0F,
        }
    }

    /// Extracts the id from the raw byte, shifted down to bit 0.
    pub fn decode(&self, byte: u8) -> u8 {
        (byte & self.mask) >> self.mask.trailing_zeros().min(7)
    }
}

/// Complete register map of one board model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    pub model: &'static str,
    pub regions: &'static [RegionLayout],
    pub board_id: Option<BoardIdLocation>,
}

impl BoardLayout {
    pub fn region(&self, region: usize) -> Result<&RegionLayout> {
        self.regions.get(region).ok_or(Error::UnknownRegion {
            region,
            count: self.regions.len(),
        })
    }
}
