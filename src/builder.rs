use core::marker::PhantomData;

use crate::{
    descriptor::BoardDescriptor,
    driver::{BoardDriver, SharedDriver},
    error::Result,
    io::PhysicalIo,
    layout::BoardLayout,
    policy::{AccessPolicy, AllowAllPolicy},
};

// Builder states
pub struct NeedDescriptor;
pub struct NeedLayout;
pub struct NeedAccessPolicy;
pub struct NeedIo;
pub struct Ready;

/// Step-by-step construction of a [`BoardDriver`].
///
/// ```rust,no_run
/// use interface_hal::prelude::*;
/// use interface_hal::boards::pci2724;
///
/// # fn main() -> interface_hal::Result<()> {
/// let driver = DriverBuilder::new()
///     .descriptor(BoardDescriptor::load("pci2724.toml")?)
///     .layout(pci2724::LAYOUT)
///     .default_access()
///     .io(SimulatedIo::new())
///     .open()?;
/// # let _ = driver;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder<AP, IO, State> {
    descriptor: Option<BoardDescriptor>,
    layout: Option<BoardLayout>,
    access_policy: Option<AP>,
    io: Option<IO>,
    _phantom: PhantomData<State>,
}

impl DriverBuilder<(), (), NeedDescriptor> {
    pub fn new() -> Self {
        DriverBuilder {
            descriptor: None,
            layout: None,
            access_policy: None,
            io: None,
            _phantom: PhantomData,
        }
    }

    pub fn descriptor(self, descriptor: BoardDescriptor) -> DriverBuilder<(), (), NeedLayout> {
        DriverBuilder {
            descriptor: Some(descriptor),
            layout: None,
            access_policy: None,
            io: None,
            _phantom: PhantomData,
        }
    }
}

impl Default for DriverBuilder<(), (), NeedDescriptor> {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverBuilder<(), (), NeedLayout> {
    pub fn layout(self, layout: BoardLayout) -> DriverBuilder<(), (), NeedAccessPolicy> {
        DriverBuilder {
            descriptor: self.descriptor,
            layout: Some(layout),
            access_policy: None,
            io: None,
            _phantom: PhantomData,
        }
    }
}

impl DriverBuilder<(), (), NeedAccessPolicy> {
    pub fn access_policy<AP: AccessPolicy>(self, policy: AP) -> DriverBuilder<AP, (), NeedIo> {
        DriverBuilder {
            descriptor: self.descriptor,
            layout: self.layout,
            access_policy: Some(policy),
            io: None,
            _phantom: PhantomData,
        }
    }

    /// Use the default allow-all access policy
    pub fn default_access(self) -> DriverBuilder<AllowAllPolicy, (), NeedIo> {
        self.access_policy(AllowAllPolicy::default())
    }
}

impl<AP: AccessPolicy> DriverBuilder<AP, (), NeedIo> {
    pub fn io<IO: PhysicalIo>(self, io: IO) -> DriverBuilder<AP, IO, Ready> {
        DriverBuilder {
            descriptor: self.descriptor,
            layout: self.layout,
            access_policy: self.access_policy,
            io: Some(io),
            _phantom: PhantomData,
        }
    }
}

impl<AP: AccessPolicy, IO: PhysicalIo> DriverBuilder<AP, IO, Ready> {
    /// Opens the board, reading its board id.
    pub fn open(self) -> Result<BoardDriver<IO, AP>> {
        // Every field is set by the time the builder reaches `Ready`.
        match (self.descriptor, self.layout, self.io, self.access_policy) {
            (Some(descriptor), Some(layout), Some(io), Some(policy)) => {
                BoardDriver::open(descriptor, layout, io, policy)
            }
            _ => unreachable!("builder reached Ready with a missing field"),
        }
    }

    /// Opens the board and wraps it for sharing between threads.
    pub fn open_shared(self) -> Result<SharedDriver<IO, AP>> {
        self.open().map(SharedDriver::new)
    }
}
