//! Test support utilities - only compiled in test builds.

use crate::{
    descriptor::{BoardDescriptor, RegionDescriptor, ValidRange},
    driver::BoardDriver,
    io::SimulatedIo,
    layout::{BoardIdLocation, BoardLayout, RegionLayout},
    policy::AccessPolicy,
    register::RegisterSequence,
    types::{FlagNames, RegionKind},
};

/// Two-byte register: `A`/`B` in byte 0, `C` in byte 1.
pub const TWO_BYTE_TABLE: &[FlagNames] = &[
    ["A", "B", "", "", "", "", "", ""],
    ["C", "", "", "", "", "", "", ""],
];

static REGIONS: [RegionLayout; 2] = [
    RegionLayout::new(TWO_BYTE_TABLE, TWO_BYTE_TABLE),
    RegionLayout::EMPTY,
];

/// Port region 0 (16 bytes, board id in the low nibble of 0x0f) and
/// memory region 1 (64-byte BAR with windows 0x00-0x07 and 0x20-0x2f).
pub static TEST_LAYOUT: BoardLayout = BoardLayout {
    model: "TEST-0001",
    regions: &REGIONS,
    board_id: Some(BoardIdLocation::low_nibble(0, 0x0f)),
};

pub const PORT_BASE: u64 = 0xd000;

pub fn test_descriptor() -> BoardDescriptor {
    let mut memory = RegionDescriptor::new(RegionKind::Memory, 0xfebf_0000, 64);
    memory.valid = vec![
        ValidRange { offset: 0, size: 8 },
        ValidRange {
            offset: 0x20,
            size: 16,
        },
    ];
    let mut desc = BoardDescriptor::new(
        TEST_LAYOUT.model,
        vec![
            RegionDescriptor::new(RegionKind::Port, PORT_BASE, 16),
            memory,
        ],
    );
    desc.slot = "0000:03:00.0".into();
    desc
}

pub fn test_driver() -> BoardDriver<SimulatedIo> {
    BoardDriver::new(test_descriptor(), TEST_LAYOUT, SimulatedIo::new()).unwrap()
}

pub fn two_byte_register() -> RegisterSequence {
    RegisterSequence::from_template(TWO_BYTE_TABLE, 0)
}

/// Allows reads only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnlyPolicy;

impl AccessPolicy for ReadOnlyPolicy {
    fn can_read(&self, _region: usize, _offset: u64, _len: usize) -> bool {
        true
    }

    fn can_write(&self, _region: usize, _offset: u64, _len: usize) -> bool {
        false
    }
}
