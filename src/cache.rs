use crate::{
    descriptor::BoardDescriptor,
    error::{Error, Result},
    layout::{BoardLayout, RegionLayout},
    register::{ByteCell, RegisterSequence},
    types::{Direction, RegionState},
};

struct RegionShadow {
    inputs: RegisterSequence,
    outputs: RegisterSequence,
    state: RegionState,
}

impl RegionShadow {
    fn new(layout: &RegionLayout, size: usize) -> Self {
        let mut inputs = RegisterSequence::from_template(layout.inputs, 0);
        let mut outputs = RegisterSequence::from_template(layout.outputs, 0);
        inputs.pad_to(0, size);
        outputs.pad_to(0, size);
        Self {
            inputs,
            outputs,
            state: RegionState::Uninitialized,
        }
    }

    fn side(&self, direction: Direction) -> &RegisterSequence {
        match direction {
            Direction::In => &self.inputs,
            Direction::Out => &self.outputs,
        }
    }

    fn side_mut(&mut self, direction: Direction) -> &mut RegisterSequence {
        match direction {
            Direction::In => &mut self.inputs,
            Direction::Out => &mut self.outputs,
        }
    }
}

/// Last-read and last-written bytes of every region, addressed by offset.
///
/// Each side of a region is a [`RegisterSequence`] built from the board's
/// flag tables and padded with blank cells up to the region size.
pub(crate) struct ShadowCache {
    regions: Vec<RegionShadow>,
}

impl ShadowCache {
    pub(crate) fn new(layout: &BoardLayout, descriptor: &BoardDescriptor) -> Self {
        let regions = descriptor
            .regions
            .iter()
            .enumerate()
            .map(|(i, region)| {
                let tables = layout.regions.get(i).unwrap_or(&RegionLayout::EMPTY);
                RegionShadow::new(tables, region.size)
            })
            .collect();
        Self { regions }
    }

    fn region(&self, region: usize) -> Result<&RegionShadow> {
        self.regions.get(region).ok_or(Error::UnknownRegion {
            region,
            count: self.regions.len(),
        })
    }

    fn region_mut(&mut self, region: usize) -> Result<&mut RegionShadow> {
        let count = self.regions.len();
        self.regions
            .get_mut(region)
            .ok_or(Error::UnknownRegion { region, count })
    }

    pub(crate) fn sequence(&self, direction: Direction, region: usize) -> Result<&RegisterSequence> {
        Ok(self.region(region)?.side(direction))
    }

    /// Cells covering `len` bytes at `offset`.
    pub(crate) fn cells(
        &self,
        direction: Direction,
        region: usize,
        offset: u64,
        len: usize,
    ) -> Result<&[ByteCell]> {
        self.sequence(direction, region)?.window(offset, len)
    }

    /// Fails unless `len` bytes at `offset` are cached on both sides.
    pub(crate) fn check(&self, region: usize, offset: u64, len: usize) -> Result<()> {
        let shadow = self.region(region)?;
        shadow.inputs.check_range(offset, len)?;
        shadow.outputs.check_range(offset, len)?;
        Ok(())
    }

    /// Stores bytes that were just transferred and marks the region ready.
    pub(crate) fn record(
        &mut self,
        direction: Direction,
        region: usize,
        offset: u64,
        data: &[u8],
    ) -> Result<()> {
        let shadow = self.region_mut(region)?;
        shadow.side_mut(direction).write_bytes(offset, data)?;
        shadow.state = RegionState::Ready;
        Ok(())
    }

    pub(crate) fn state(&self, region: usize) -> Result<RegionState> {
        Ok(self.region(region)?.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TEST_LAYOUT, test_descriptor};

    #[test]
    fn sized_to_region_with_named_prefix() {
        let cache = ShadowCache::new(&TEST_LAYOUT, &test_descriptor());
        let outputs = cache.sequence(Direction::Out, 0).unwrap();
        assert_eq!(outputs.size(), 16);
        assert_eq!(outputs.start_address(), 0);
        assert_eq!(outputs.cell(1).unwrap().names()[0], "C");
        assert_eq!(outputs.cell(15).unwrap().names()[0], "");
    }

    #[test]
    fn record_marks_ready_per_region() {
        let mut cache = ShadowCache::new(&TEST_LAYOUT, &test_descriptor());
        assert_eq!(cache.state(0).unwrap(), RegionState::Uninitialized);

        cache.record(Direction::Out, 0, 2, &[0x12, 0x34]).unwrap();
        assert_eq!(cache.state(0).unwrap(), RegionState::Ready);
        assert_eq!(cache.state(1).unwrap(), RegionState::Uninitialized);

        let cells = cache.cells(Direction::Out, 0, 2, 2).unwrap();
        assert_eq!(cells[0].value(), 0x12);
        assert_eq!(cells[1].value(), 0x34);
        // Input side untouched
        assert_eq!(cache.cells(Direction::In, 0, 2, 1).unwrap()[0].value(), 0);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut cache = ShadowCache::new(&TEST_LAYOUT, &test_descriptor());
        assert!(cache.check(0, 15, 2).is_err());
        assert!(cache.record(Direction::In, 0, 16, &[0]).is_err());
        assert!(matches!(
            cache.check(9, 0, 1),
            Err(Error::UnknownRegion { region: 9, .. })
        ));
    }
}
