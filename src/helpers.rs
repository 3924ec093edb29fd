//! Address range arithmetic shared by the access policy, the shadow cache and
//! register sequences.
//!
//! Useful when implementing a custom [`AccessPolicy`](crate::AccessPolicy)
//! that needs to reason about the same ranges the built-in policy reports.

use core::fmt;

use crate::error::{Error, Result};

/// Half-open byte range `[start, end)`.
///
/// Displays inclusively (`0x10-0x13`), the way board manuals list registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddrRange {
    pub start: u64,
    pub end: u64,
}

impl AddrRange {
    /// Range of `len` bytes starting at `start`.
    ///
    /// A range whose end overflows `u64` saturates, so it is always rejected
    /// by [`contains`](Self::contains) rather than wrapping around.
    pub fn new(start: u64, len: usize) -> Self {
        Self {
            start,
            end: start.saturating_add(len as u64),
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `other` lies entirely inside this range.
    pub fn contains(&self, other: &AddrRange) -> bool {
        !other.is_empty() && self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.end.saturating_sub(1).max(self.start);
        write!(f, "{:#x}-{:#x}", self.start, last)
    }
}

/// List of ranges rendered as `0x0-0xf, 0x20-0x2f`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeList(pub Vec<AddrRange>);

impl fmt::Display for RangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

/// Calculates the index span of `len` bytes at `addr` within a sequence of
/// `total` bytes whose first address is `base`.
///
/// Returns `(start_index, end_index)` where end is exclusive.
///
/// # Errors
/// * [`Error::IndexOutOfRange`] - if `len` is 0 or the range leaves the sequence
pub fn range_span(base: u64, total: usize, addr: u64, len: usize) -> Result<(usize, usize)> {
    let window = AddrRange::new(base, total);
    let attempted = AddrRange::new(addr, len);

    if !window.contains(&attempted) {
        return Err(Error::IndexOutOfRange {
            attempted,
            start: base,
            end: window.end.saturating_sub(1),
        });
    }

    let offset = (addr - base) as usize;
    Ok((offset, offset + len))
}

#[test]
fn range_span_edge_cases() {
    // Zero length
    assert!(matches!(
        range_span(0, 16, 0, 0),
        Err(Error::IndexOutOfRange { .. })
    ));

    // Out of bounds
    assert!(matches!(
        range_span(0, 16, 15, 2),
        Err(Error::IndexOutOfRange { .. })
    ));

    // Below base
    assert!(matches!(
        range_span(0x10, 4, 0x0f, 1),
        Err(Error::IndexOutOfRange { .. })
    ));

    // Last byte
    assert_eq!(range_span(0, 16, 15, 1).unwrap(), (15, 16));

    // Offset base
    assert_eq!(range_span(0x10, 16, 0x12, 4).unwrap(), (2, 6));

    // Overflowing end never wraps
    assert!(range_span(0, 16, u64::MAX, 2).is_err());
}

#[test]
fn ranges_display_inclusively() {
    let list = RangeList(vec![AddrRange::new(0, 16), AddrRange::new(0x20, 4)]);
    assert_eq!(list.to_string(), "0x0-0xf, 0x20-0x23");
    assert_eq!(AddrRange::new(0x10, 1).to_string(), "0x10-0x10");
    assert_eq!(RangeList::default().to_string(), "(none)");
}
