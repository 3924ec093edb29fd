use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::helpers::{AddrRange, RangeList};

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the register model and the board driver base.
///
/// Every variant is fatal for the operation that produced it. Nothing in
/// this crate retries or swallows an error.
#[derive(Debug, Error)]
pub enum Error {
    /// Access range lies outside every valid range of the region.
    #[error(
        "bad memory access: region {region} I/O addr space is {valid} while tried to access {attempted}"
    )]
    BadMemoryAccess {
        region: usize,
        attempted: AddrRange,
        valid: RangeList,
    },

    /// Access width not supported by the region's bus.
    #[error("invalid access size: size should be one of {allowed:?} while {size} is given")]
    InvalidAccessSize {
        size: usize,
        allowed: &'static [usize],
    },

    /// Byte length cannot be decoded as a number.
    #[error("invalid size: cannot decode {size} bytes as a number")]
    InvalidSize { size: usize },

    /// Flag name is not present in any flag table of the register.
    #[error("unknown flag name `{name}`")]
    UnknownFlagName { name: String },

    /// Region index is not configured for this board.
    #[error("unknown region {region}: board has {count} region(s)")]
    UnknownRegion { region: usize, count: usize },

    /// Address outside a register sequence.
    #[error("address range {attempted} is outside register range {start:#x}-{end:#x}")]
    IndexOutOfRange {
        attempted: AddrRange,
        start: u64,
        end: u64,
    },

    /// Integer does not fit in the register width.
    #[error("value {value:#x} does not fit in {size} byte(s)")]
    ValueOverflow { value: u64, size: usize },

    /// Explicit cell addresses are not contiguous and increasing.
    #[error("cell addresses must be contiguous: expected {expected:#x}, found {found:#x}")]
    NonContiguous { expected: u64, found: u64 },

    /// Access refused by a custom access policy.
    #[error("access denied by policy: region {region} offset {offset:#x} size {size}")]
    Denied {
        region: usize,
        offset: u64,
        size: usize,
    },

    /// Logical channel number out of range for the board.
    #[error("invalid channel: ch should be in {min}-{max} while {channel} is given")]
    InvalidChannel { channel: u32, min: u32, max: u32 },

    /// Logical axis number out of range for a motion board.
    #[error("invalid axis: axis should be in {min}-{max} while {axis} is given")]
    InvalidAxis { axis: u32, min: u32, max: u32 },

    /// No candidate board reported the requested board id.
    #[error("board {model} with id {board_id} not found")]
    BoardNotFound { model: &'static str, board_id: u8 },

    /// Caller-supplied polling deadline expired.
    #[error("timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// Sampler worker is no longer running.
    #[error("sampler worker stopped")]
    SamplerStopped,

    /// Board descriptor could not be parsed.
    #[error("invalid board descriptor: {0}")]
    Descriptor(#[from] toml::de::Error),

    /// Board descriptor file could not be read.
    #[error("failed to read board descriptor {path}: {source}")]
    DescriptorFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failure of the physical I/O primitive, passed through untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
