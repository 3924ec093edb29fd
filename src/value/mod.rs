mod macros;

use core::fmt;

use heapless::Vec as FixedVec;

use crate::{
    codec,
    error::{Error, Result},
    register::{ByteCell, RegisterSequence},
    types::FlagNames,
};

use macros::{impl_exact_view, impl_exact_views};

/// Widest single bus access, in bytes.
pub const MAX_ACCESS: usize = 8;

/// Bytes returned by one validated access, paired with the flag tables of
/// the region at that offset.
///
/// This is what board drivers query after [`read`](crate::BoardDriver::read)
/// or [`get_log`](crate::BoardDriver::get_log): numeric views, flag names and
/// named-bit lookup all work on the same little-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue {
    region: usize,
    offset: u64,
    bytes: FixedVec<u8, MAX_ACCESS>,
    names: FixedVec<&'static FlagNames, MAX_ACCESS>,
}

impl RegisterValue {
    /// Captures the current values and flag tables of `cells`.
    ///
    /// # Errors
    /// * [`Error::InvalidSize`] - if more than [`MAX_ACCESS`] cells are given
    pub fn from_cells(region: usize, cells: &[ByteCell]) -> Result<Self> {
        let too_long = || Error::InvalidSize { size: cells.len() };
        let mut bytes = FixedVec::new();
        let mut names = FixedVec::new();
        for cell in cells {
            bytes.push(cell.value()).map_err(|_| too_long())?;
            names.push(cell.names()).map_err(|_| too_long())?;
        }
        Ok(Self {
            region,
            offset: cells.first().map_or(0, ByteCell::address),
            bytes,
            names,
        })
    }

    #[inline]
    pub fn region(&self) -> usize {
        self.region
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn flag_table(&self) -> Vec<FlagNames> {
        self.names.iter().map(|n| **n).collect()
    }

    pub fn to_uint(&self) -> Result<u64> {
        codec::to_uint(&self.bytes)
    }

    pub fn to_int(&self) -> Result<i64> {
        codec::to_int(&self.bytes)
    }

    pub fn to_float(&self) -> Result<f64> {
        codec::to_float(&self.bytes)
    }

    impl_exact_views!();

    pub fn to_bits(&self) -> Vec<bool> {
        codec::bytes_to_bits(&self.bytes)
    }

    /// Space-joined names of the set bits.
    pub fn to_flags(&self) -> String {
        codec::active_flag_names(&self.bytes, &self.flag_table())
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02X}")).collect()
    }

    pub fn to_binary_string(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:08b}")).collect()
    }

    /// State of the first bit named `name`, or `None` if no byte has it.
    pub fn get(&self, name: &str) -> Option<bool> {
        if name.is_empty() {
            return None;
        }
        self.bytes.iter().zip(&self.names).find_map(|(&byte, names)| {
            names
                .iter()
                .position(|n| *n == name)
                .map(|i| byte & (1 << i) != 0)
        })
    }

    /// State of the first bit named `name`.
    ///
    /// # Errors
    /// * [`Error::UnknownFlagName`] - if no byte names a bit `name`
    pub fn flag(&self, name: &str) -> Result<bool> {
        self.get(name).ok_or_else(|| Error::UnknownFlagName {
            name: name.to_string(),
        })
    }

    /// Detached register sequence holding these bytes at their offsets.
    pub fn to_register(&self) -> RegisterSequence {
        let cells = self
            .bytes
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(i, (&byte, &names))| {
                ByteCell::new(self.offset + i as u64, names).with_value(byte)
            })
            .collect::<Vec<_>>();
        // Offsets are assigned consecutively above, so this cannot fail.
        RegisterSequence::from_cells(cells).unwrap_or_default()
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_register())
    }
}
