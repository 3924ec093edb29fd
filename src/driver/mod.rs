//! Board driver base.
//!
//! [`BoardDriver`] is the uniform primitive every board-specific driver is
//! built on: validated physical reads and writes, a per-region shadow cache
//! of the last bytes read and written, and named-flag writes composed from
//! the board's static flag tables.
//!
//! Every physical access goes through the same steps:
//!
//! 1. bus validation ([`RangePolicy`]): access width, then address range;
//! 2. the driver's [`AccessPolicy`], which may refuse the access;
//! 3. the physical transfer through [`PhysicalIo`];
//! 4. the shadow cache update for exactly the bytes transferred.
//!
//! A failure at any step leaves the cache untouched.

mod handle;
mod macros;

use core::ops::RangeBounds;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::{
    cache::ShadowCache,
    descriptor::BoardDescriptor,
    error::{Error, Result},
    helpers::AddrRange,
    io::{IoAddress, PhysicalIo},
    layout::BoardLayout,
    policy::{AccessPolicy, AllowAllPolicy, RangePolicy},
    register::RegisterSequence,
    types::{Direction, RegionState},
    value::{MAX_ACCESS, RegisterValue},
};

pub use handle::SharedDriver;
use macros::{impl_typed_access, impl_typed_accessors};

/// One opened board: descriptor, static layout, bus access and shadow cache.
pub struct BoardDriver<IO, AP = AllowAllPolicy> {
    descriptor: BoardDescriptor,
    layout: BoardLayout,
    bounds: RangePolicy,
    access_policy: AP,
    io: IO,
    cache: ShadowCache,
    board_id: Option<u8>,
}

impl<IO, AP> core::fmt::Debug for BoardDriver<IO, AP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoardDriver")
            .field("model", &self.layout.model)
            .field("slot", &self.descriptor.slot)
            .field("board_id", &self.board_id)
            .finish_non_exhaustive()
    }
}

impl<IO: PhysicalIo> BoardDriver<IO> {
    /// Opens a board with no access restrictions beyond bus validation.
    pub fn new(descriptor: BoardDescriptor, layout: BoardLayout, io: IO) -> Result<Self> {
        Self::open(descriptor, layout, io, AllowAllPolicy::default())
    }
}

impl<IO, AP> BoardDriver<IO, AP>
where
    IO: PhysicalIo,
    AP: AccessPolicy,
{
    /// Opens a board and reads its board id from the hardware.
    ///
    /// The shadow cache starts zeroed and every region starts
    /// [`RegionState::Uninitialized`].
    pub fn open(
        descriptor: BoardDescriptor,
        layout: BoardLayout,
        io: IO,
        access_policy: AP,
    ) -> Result<Self> {
        let mut driver = Self {
            bounds: RangePolicy::from_descriptor(&descriptor),
            cache: ShadowCache::new(&layout, &descriptor),
            descriptor,
            layout,
            access_policy,
            io,
            board_id: None,
        };

        if let Some(location) = layout.board_id {
            let raw = driver.read_u8(location.region, location.offset)?;
            driver.board_id = Some(location.decode(raw));
        }

        info!(
            model = driver.layout.model,
            slot = %driver.descriptor.slot,
            board_id = ?driver.board_id,
            regions = driver.descriptor.regions.len(),
            "board opened"
        );
        Ok(driver)
    }

    fn address(&self, region: usize, offset: u64) -> Result<IoAddress> {
        let desc = self.descriptor.region(region)?;
        Ok(IoAddress::for_region(desc.kind, region, desc.base, offset))
    }

    fn validate_read(&self, region: usize, offset: u64, size: usize) -> Result<AddrRange> {
        let range = self.bounds.validate(region, offset, size)?;
        if !self.access_policy.can_read(region, offset, size) {
            return Err(Error::Denied {
                region,
                offset,
                size,
            });
        }
        self.cache.check(region, offset, size)?;
        Ok(range)
    }

    fn validate_write(&self, region: usize, offset: u64, size: usize) -> Result<AddrRange> {
        let range = self.bounds.validate(region, offset, size)?;
        if !self.access_policy.can_write(region, offset, size) {
            return Err(Error::Denied {
                region,
                offset,
                size,
            });
        }
        self.cache.check(region, offset, size)?;
        Ok(range)
    }

    /// Reads `size` bytes at `offset` of `region` from the board.
    ///
    /// The bytes are stored in the input shadow cache and returned with the
    /// input flag tables at that offset.
    ///
    /// # Errors
    /// * [`Error::InvalidAccessSize`] - if the region's bus cannot do a `size`-byte access
    /// * [`Error::BadMemoryAccess`] - if the range is not inside one valid range
    /// * [`Error::Denied`] - if the access policy refuses the read
    /// * [`Error::Io`] - if the physical read fails
    pub fn read(&mut self, region: usize, offset: u64, size: usize) -> Result<RegisterValue> {
        let range = self.validate_read(region, offset, size)?;
        let address = self.address(region, offset)?;

        let mut buf = [0u8; MAX_ACCESS];
        let buf = &mut buf[..size];
        self.io.read_physical(address, buf)?;
        debug!(region, range = %range, size, "read");

        self.cache.record(Direction::In, region, offset, buf)?;
        RegisterValue::from_cells(region, self.cache.cells(Direction::In, region, offset, size)?)
    }

    /// Writes `data` at `offset` of `region` in one bus access.
    ///
    /// The written bytes become the output shadow for that range. Nothing is
    /// read back.
    ///
    /// # Errors
    /// Same as [`read`](Self::read), with the access size being `data.len()`.
    pub fn write(&mut self, region: usize, offset: u64, data: &[u8]) -> Result<()> {
        let range = self.validate_write(region, offset, data.len())?;
        let address = self.address(region, offset)?;

        self.io.write_physical(address, data)?;
        debug!(region, range = %range, size = data.len(), "write");

        self.cache.record(Direction::Out, region, offset, data)
    }

    impl_typed_accessors!();

    /// Writes a whole register sequence at its start address.
    pub fn write_register(&mut self, region: usize, register: &RegisterSequence) -> Result<()> {
        self.write(region, register.start_address(), &register.to_bytes())
    }

    /// Detached copy of the output shadow over `range`, for composing updates.
    pub fn output_register(
        &self,
        region: usize,
        range: impl RangeBounds<u64>,
    ) -> Result<RegisterSequence> {
        self.cache.sequence(Direction::Out, region)?.slice(range)
    }

    /// Writes one byte whose bits are set exactly for the flags named in
    /// `names` (space or comma separated) and cleared otherwise.
    ///
    /// Names that are not in the output flag table at `offset` are ignored,
    /// so an empty string clears every bit.
    pub fn set_flag(&mut self, region: usize, offset: u64, names: &str) -> Result<()> {
        self.update_byte(region, offset, |reg| reg.set(names))
    }

    /// Sets the named bits of the byte at `offset`, keeping the other bits
    /// as last written.
    pub fn bit_on(&mut self, region: usize, offset: u64, names: &str) -> Result<()> {
        self.update_byte(region, offset, |reg| {
            reg.bit_on(names);
            Ok(())
        })
    }

    /// Clears the named bits of the byte at `offset`, keeping the other bits
    /// as last written.
    pub fn bit_off(&mut self, region: usize, offset: u64, names: &str) -> Result<()> {
        self.update_byte(region, offset, |reg| {
            reg.bit_off(names);
            Ok(())
        })
    }

    fn update_byte(
        &mut self,
        region: usize,
        offset: u64,
        f: impl FnOnce(&mut RegisterSequence) -> Result<()>,
    ) -> Result<()> {
        self.validate_write(region, offset, 1)?;
        let mut reg = self.output_register(region, offset..=offset)?;
        f(&mut reg)?;
        self.write_register(region, &reg)
    }

    /// Last byte read (`In`) or written (`Out`) at `offset`, from the shadow
    /// cache. No physical access is made.
    pub fn get_log(&self, direction: Direction, region: usize, offset: u64) -> Result<RegisterValue> {
        self.get_log_range(direction, region, offset, 1)
    }

    /// Like [`get_log`](Self::get_log) for up to eight consecutive bytes.
    pub fn get_log_range(
        &self,
        direction: Direction,
        region: usize,
        offset: u64,
        size: usize,
    ) -> Result<RegisterValue> {
        RegisterValue::from_cells(region, self.cache.cells(direction, region, offset, size)?)
    }

    /// Reads the byte at `offset` until the flag `name` equals `expected`.
    ///
    /// Busy-waits without sleeping. Returns the matching value, or
    /// [`Error::Timeout`] once `timeout` has elapsed after a non-matching
    /// read.
    pub fn poll_flag(
        &mut self,
        region: usize,
        offset: u64,
        name: &str,
        expected: bool,
        timeout: Duration,
    ) -> Result<RegisterValue> {
        let started = Instant::now();
        loop {
            let value = self.read(region, offset, 1)?;
            if value.flag(name)? == expected {
                return Ok(value);
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(Error::Timeout { waited });
            }
            core::hint::spin_loop();
        }
    }

    pub fn region_state(&self, region: usize) -> Result<RegionState> {
        self.cache.state(region)
    }
}

impl<IO, AP> BoardDriver<IO, AP> {
    /// Board id read at open, if the layout defines where it lives.
    pub fn board_id(&self) -> Option<u8> {
        self.board_id
    }

    pub fn descriptor(&self) -> &BoardDescriptor {
        &self.descriptor
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn access_policy(&self) -> &AP {
        &self.access_policy
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

/// Opens the first candidate of `layout.model` whose board id is `board_id`.
///
/// `io_for` creates the bus access for a candidate. An error from `io_for`
/// or from opening a candidate aborts the search. Boards whose layout has no
/// board id location report id 0.
///
/// # Errors
/// * [`Error::BoardNotFound`] - if no candidate matches
pub fn open_board<IO, I, F>(
    candidates: I,
    layout: BoardLayout,
    board_id: u8,
    mut io_for: F,
) -> Result<BoardDriver<IO>>
where
    IO: PhysicalIo,
    I: IntoIterator<Item = BoardDescriptor>,
    F: FnMut(&BoardDescriptor) -> Result<IO>,
{
    for descriptor in candidates {
        if descriptor.model != layout.model {
            continue;
        }
        let io = io_for(&descriptor)?;
        let driver = BoardDriver::new(descriptor, layout, io)?;
        if driver.board_id().unwrap_or(0) == board_id {
            return Ok(driver);
        }
        debug!(
            model = layout.model,
            found = ?driver.board_id(),
            wanted = board_id,
            "skipping board"
        );
    }
    Err(Error::BoardNotFound {
        model: layout.model,
        board_id,
    })
}
