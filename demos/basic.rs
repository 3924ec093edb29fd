//! Basic example: a PCI-2724 digital I/O board on simulated hardware
//!
//! This example demonstrates:
//! - Loading a board descriptor from TOML
//! - Opening a board driver over `SimulatedIo`
//! - Driving single output points without clobbering the others
//! - Reading inputs as integers, bits and flag names
//! - Reading back write-only control registers from the shadow cache

use interface_hal::boards::pci2724::{ByteGroup, Pci2724};
use interface_hal::prelude::*;

// ============ Board Descriptor ============
// On real hardware this comes from PCI enumeration; here it is inline.

const DESCRIPTOR: &str = r#"
model = "PCI-2724"
slot = "0000:03:00.0"

[[regions]]
kind = "port"
base = 0xd000
size = 16
"#;

const BASE: u64 = 0xd000;

pub fn main() {
    let descriptor = BoardDescriptor::from_toml_str(DESCRIPTOR).unwrap();

    // Pretend the board answers with id 3 and a pattern on inputs 1-16
    let mut io = SimulatedIo::new();
    io.set_input(IoAddress::Port(BASE + 0x0f), &[0x03]);
    io.set_input(IoAddress::Port(BASE), &[0b1010_0101, 0x01]);

    let mut board = Pci2724::open(descriptor, io).unwrap();
    println!("opened board id {:?}", board.driver().board_id());
    board.initialize().unwrap();

    // ========== Outputs ==========
    // output_point composes from the last written value, so the second call
    // keeps points 1-3 as they were.
    board.output_point(1, &[true, false, true]).unwrap();
    board.output_point(8, &[true]).unwrap();
    let outputs = board
        .driver()
        .get_log(Direction::Out, 0, 0x00)
        .unwrap()
        .to_u8()
        .unwrap();
    assert_eq!(outputs, 0b1000_0101);
    println!("outputs 1-8 = {outputs:#010b}");

    // ========== Inputs ==========
    let low = board.input_byte(ByteGroup::Points1To8).unwrap();
    println!("inputs 1-8 = {} ({})", low.to_hex(), low.to_binary_string());
    let points = board.input_point(9, 2).unwrap();
    println!("inputs 9-10 = {points:?}");

    // ========== Control registers ==========
    // Latch control is write-only on the board; the shadow cache remembers it.
    board.set_latch_status("PORT0 PORT2").unwrap();
    let latch = board.driver().get_log(Direction::Out, 0, 0x0b).unwrap();
    assert_eq!(latch.to_flags(), "PORT0 PORT2");
    println!("latched ports: {}", latch.to_flags());

    // A bad access never reaches the bus
    let err = board.driver_mut().read(0, 0x0e, 4).unwrap_err();
    println!("rejected: {err}");

    println!("bus operations: {}", board.driver().io().operations().len());
}
