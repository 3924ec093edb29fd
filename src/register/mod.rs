//! Named bit-field registers.
//!
//! A [`RegisterSequence`] is a contiguous run of [`ByteCell`]s. Each cell
//! borrows its eight positional flag names from static board tables and owns
//! only its current byte value.

mod cell;
mod sequence;

pub use cell::ByteCell;
pub use sequence::{RegisterSequence, SetValue};
