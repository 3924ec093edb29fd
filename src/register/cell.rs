use core::fmt;

use bitmaps::Bitmap;

use crate::{codec, types::FlagNames};

/// One addressable register byte with its positional flag names.
///
/// The flag table is borrowed from static board data; only `value` is owned
/// and mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCell {
    address: u64,
    names: &'static FlagNames,
    value: u8,
}

impl ByteCell {
    /// Creates a zeroed cell.
    pub const fn new(address: u64, names: &'static FlagNames) -> Self {
        Self {
            address,
            names,
            value: 0,
        }
    }

    /// Returns the cell with its value replaced.
    pub const fn with_value(mut self, value: u8) -> Self {
        self.value = value;
        self
    }

    #[inline]
    pub fn address(&self) -> u64 {
        self.address
    }

    #[inline]
    pub fn names(&self) -> &'static FlagNames {
        self.names
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub(crate) fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Returns bit `index` (0 = LSB).
    ///
    /// # Panics
    /// Panics if `index >= 8`.
    pub fn bit(&self, index: usize) -> bool {
        assert!(index < 8, "bit index {index} out of range for a byte");
        Bitmap::<8>::from_value(self.value).get(index)
    }

    /// Bit position of a non-blank flag name.
    pub fn position(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.names.iter().position(|n| *n == name)
    }

    /// Mask of the bits whose names appear in `wanted`.
    pub fn mask_for<S: AsRef<str>>(&self, wanted: &[S]) -> u8 {
        codec::flag_mask(self.names, wanted)
    }
}

impl fmt::Display for ByteCell {
    /// Renders the address, the value in hex and binary, and one line per bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Address 0x{:02X} : value = 0x{:02X} (0b{:08b})",
            self.address, self.value, self.value
        )?;
        for (i, name) in self.names.iter().enumerate() {
            let bit = u8::from(self.bit(i));
            if name.is_empty() {
                writeln!(f, "  {i} : {bit}")?;
            } else {
                writeln!(f, "  {i} : {name} = {bit}")?;
            }
        }
        Ok(())
    }
}
