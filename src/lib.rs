//! Register model and driver base for Interface Corp PCI/ISA I/O boards.
//!
//! This crate provides the layer every board driver shares: named bit-field
//! registers, validated physical reads and writes, and a shadow cache of the
//! last bytes read and written per region.
//!
//! # Features
//!
//! - **Named-bit registers** - Set, clear and query bits by their datasheet names
//! - **Partial updates** - Flip one flag without clobbering its neighbours
//! - **Validated access** - Access width and address range checked before the bus
//! - **Shadow cache** - Read back write-only registers from the last value written
//! - **Background sampling** - Bounded ring buffer fed by a worker thread
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────────────┐     ┌─────────────┐
//! │  Board driver    │     │  BoardDriver                 │     │ PhysicalIo  │
//! │  (pci2724, ...)  │     │                              │     │             │
//! │                  │────▶│  RangePolicy + AccessPolicy  │────▶│ read/write  │
//! │  set_flag()      │     │  (size, range, permission)   │     │ _physical() │
//! │  read().to_*()   │◀────│                              │◀────│             │
//! │                  │     │  ShadowCache (in / out)      │     └─────────────┘
//! │  get_log()       │◀────│  RegisterSequence per region │
//! └──────────────────┘     └──────────────────────────────┘
//! ```
//!
//! - **Reads** always hit the bus and refresh the input side of the cache
//! - **Writes** refresh the output side with exactly the bytes written
//! - **`get_log`** serves either side of the cache without touching the bus
//! - **`bit_on`/`bit_off`** compose from the output side, then write
//!
//! # Example
//!
//! ```rust
//! use interface_hal::prelude::*;
//! use interface_hal::boards::pci2724::Pci2724;
//!
//! # fn main() -> interface_hal::Result<()> {
//! let descriptor = BoardDescriptor::from_toml_str(
//!     r#"
//!     model = "PCI-2724"
//!     [[regions]]
//!     kind = "port"
//!     base = 0xd000
//!     size = 16
//!     "#,
//! )?;
//!
//! let mut board = Pci2724::open(descriptor, SimulatedIo::new())?;
//!
//! // Latch ports 0 and 2, then drive outputs 1-3 without touching the rest
//! board.set_latch_status("PORT0 PORT2")?;
//! board.output_point(1, &[true, false, true])?;
//!
//! let latched = board.driver().get_log(Direction::Out, 0, 0x0b)?;
//! assert_eq!(latched.to_flags(), "PORT0 PORT2");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod boards;
pub mod builder;
pub(crate) mod cache;
pub mod codec;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod helpers;
pub mod io;
pub mod layout;
pub mod policy;
pub mod register;
pub mod sampler;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_support;

pub use builder::DriverBuilder;
pub use descriptor::{BoardDescriptor, RegionDescriptor, ValidRange};
pub use driver::{BoardDriver, SharedDriver, open_board};
pub use error::{Error, Result};
pub use helpers::{AddrRange, RangeList};
pub use io::{IoAddress, PhysicalIo, SimulatedIo};
pub use layout::{BoardIdLocation, BoardLayout, RegionLayout};
pub use policy::{AccessPolicy, AllowAllPolicy, RangePolicy};
pub use register::{ByteCell, RegisterSequence, SetValue};
pub use sampler::{Sampler, SamplerStats};
pub use types::{BLANK, Direction, FlagNames, RegionKind, RegionState};
pub use value::RegisterValue;

pub mod prelude {
    pub use super::{
        AccessPolicy, AllowAllPolicy, BoardDescriptor, BoardDriver, BoardLayout, ByteCell,
        Direction, DriverBuilder, Error, FlagNames, IoAddress, PhysicalIo, RegionDescriptor,
        RegionKind, RegionLayout, RegionState, RegisterSequence, RegisterValue, Sampler, SetValue,
        SharedDriver, SimulatedIo,
    };
}
