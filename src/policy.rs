use crate::{
    descriptor::BoardDescriptor,
    error::{Error, Result},
    helpers::{AddrRange, RangeList},
    types::RegionKind,
};

/// Additional read/write restrictions layered over bus validation.
///
/// Every access is first checked against the board's valid ranges by
/// [`RangePolicy`]; a custom policy can only narrow what is allowed.
pub trait AccessPolicy {
    /// Returns true if reading `len` bytes at `offset` of `region` is allowed.
    fn can_read(&self, region: usize, offset: u64, len: usize) -> bool;
    /// Returns true if writing `len` bytes at `offset` of `region` is allowed.
    fn can_write(&self, region: usize, offset: u64, len: usize) -> bool;
}

/// Default policy that allows every access the bus allows.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllPolicy {}

impl AccessPolicy for AllowAllPolicy {
    fn can_read(&self, _region: usize, _offset: u64, _len: usize) -> bool {
        true
    }

    fn can_write(&self, _region: usize, _offset: u64, _len: usize) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RegionBounds {
    kind: RegionKind,
    valid: Vec<AddrRange>,
}

/// Access-size and address-range validation derived from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePolicy {
    regions: Vec<RegionBounds>,
}

impl RangePolicy {
    pub fn from_descriptor(descriptor: &BoardDescriptor) -> Self {
        let regions = descriptor
            .regions
            .iter()
            .map(|r| RegionBounds {
                kind: r.kind,
                valid: r.valid_ranges(),
            })
            .collect();
        Self { regions }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Validates one access and returns its offset range.
    ///
    /// # Errors
    /// * [`Error::UnknownRegion`] - if `region` is not configured
    /// * [`Error::InvalidAccessSize`] - if the bus cannot do a `size`-byte access
    /// * [`Error::BadMemoryAccess`] - if the range is not inside one valid range
    pub fn validate(&self, region: usize, offset: u64, size: usize) -> Result<AddrRange> {
        let bounds = self.regions.get(region).ok_or(Error::UnknownRegion {
            region,
            count: self.regions.len(),
        })?;

        let allowed = bounds.kind.allowed_sizes();
        if !allowed.contains(&size) {
            return Err(Error::InvalidAccessSize { size, allowed });
        }

        let attempted = AddrRange::new(offset, size);
        if !bounds.valid.iter().any(|v| v.contains(&attempted)) {
            return Err(Error::BadMemoryAccess {
                region,
                attempted,
                valid: RangeList(bounds.valid.clone()),
            });
        }
        Ok(attempted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{RegionDescriptor, ValidRange};

    fn policy() -> RangePolicy {
        let mut mem = RegionDescriptor::new(RegionKind::Memory, 0xfebf_0000, 0x40);
        mem.valid = vec![
            ValidRange { offset: 0, size: 8 },
            ValidRange {
                offset: 0x20,
                size: 0x10,
            },
        ];
        let desc = BoardDescriptor::new(
            "TEST",
            vec![RegionDescriptor::new(RegionKind::Port, 0xd000, 16), mem],
        );
        RangePolicy::from_descriptor(&desc)
    }

    #[test]
    fn port_sizes() {
        let policy = policy();
        for size in [1, 2, 4] {
            assert!(policy.validate(0, 0, size).is_ok());
        }
        for size in [0, 3, 8] {
            assert!(matches!(
                policy.validate(0, 0, size),
                Err(Error::InvalidAccessSize { allowed, .. }) if allowed == [1, 2, 4]
            ));
        }
    }

    #[test]
    fn memory_allows_eight_bytes() {
        assert_eq!(policy().validate(1, 0, 8).unwrap(), AddrRange::new(0, 8));
    }

    #[test]
    fn range_must_fit_one_window() {
        let policy = policy();
        assert!(policy.validate(0, 12, 4).is_ok());
        assert!(matches!(
            policy.validate(0, 14, 4),
            Err(Error::BadMemoryAccess { region: 0, .. })
        ));
        // Spans the gap between two valid windows
        assert!(policy.validate(1, 6, 4).is_err());
        assert!(policy.validate(1, 0x2c, 4).is_ok());
        assert!(policy.validate(1, 0x10, 1).is_err());
    }

    #[test]
    fn error_names_both_ranges() {
        let err = policy().validate(0, 0x0e, 4).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("0xe-0x11"), "{msg}");
        assert!(msg.contains("0x0-0xf"), "{msg}");

        let err = policy().validate(0, 0, 3).unwrap_err();
        assert!(err.to_string().contains("[1, 2, 4]"));
    }

    #[test]
    fn unknown_region() {
        assert!(matches!(
            policy().validate(7, 0, 1),
            Err(Error::UnknownRegion {
                region: 7,
                count: 2
            })
        ));
    }
}
