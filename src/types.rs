use serde::{Deserialize, Serialize};

/// Positional names of the eight bits of one register byte, LSB first.
///
/// An empty string marks an unnamed or reserved bit. Blank names never
/// match a name lookup and never appear in an active-flag listing.
pub type FlagNames = [&'static str; 8];

/// Flag table for a byte with no named bits.
pub const BLANK: FlagNames = ["", "", "", "", "", "", "", ""];

/// Which side of the shadow cache an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Last values read from the board.
    In,
    /// Last values written to the board.
    Out,
}

/// Lifecycle of one register region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionState {
    /// Cache zeroed, no physical access yet.
    #[default]
    Uninitialized,
    /// At least one physical read or write succeeded.
    Ready,
}

/// How a region is reached on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Legacy I/O port block (`inb`/`inw`/`inl`).
    Port,
    /// Memory-mapped PCI BAR.
    Memory,
}

impl RegionKind {
    /// Access widths the bus supports for this kind of region.
    pub const fn allowed_sizes(self) -> &'static [usize] {
        match self {
            RegionKind::Port => &[1, 2, 4],
            RegionKind::Memory => &[1, 2, 4, 8],
        }
    }
}
