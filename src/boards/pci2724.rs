//! PCI-2724: 32-point isolated digital input / 32-point digital output.
//!
//! Everything lives in one I/O port block. Input and output latches share
//! offsets 0x00-0x03; control registers follow at 0x08-0x0e and the board id
//! switch is the low nibble of 0x0f.

use crate::{
    codec,
    descriptor::BoardDescriptor,
    driver::BoardDriver,
    error::{Error, Result},
    io::PhysicalIo,
    layout::{BoardIdLocation, BoardLayout, RegionLayout},
    policy::{AccessPolicy, AllowAllPolicy},
    types::{BLANK, Direction, FlagNames},
    value::RegisterValue,
};

/// Number of input points and of output points.
pub const POINTS: u32 = 32;

const REGION: usize = 0;
const LATCH: u64 = 0x0b;
const ACK: u64 = 0x08;
const STB: u64 = 0x09;

static INPUTS: [FlagNames; 16] = [
    ["IN1", "IN2", "IN3", "IN4", "IN5", "IN6", "IN7", "IN8"],
    ["IN9", "IN10", "IN11", "IN12", "IN13", "IN14", "IN15", "IN16"],
    ["IN17", "IN18", "IN19", "IN20", "IN21", "IN22", "IN23", "IN24"],
    ["IN25", "IN26", "IN27", "IN28", "IN29", "IN30", "IN31", "IN32"],
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    ["IRIN2", "", "", "", "", "STB2", "ACKR2", "ACK2"],
    ["IRIN1", "", "", "", "LF", "ACK1", "STBR1", "STB1"],
    ["TD1", "TD2", "TD3", "TD4", "", "", "", ""],
    ["PORT0", "PORT1", "PORT2", "PORT3", "", "", "", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "SIGT", "SIGR", "SIGRR", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "SIGT", "SIGR", "", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "EDS1", "EDS2", "EDS3", "EDS4"],
    ["BID0", "BID1", "BID2", "BID3", "", "", "", ""],
];

static OUTPUTS: [FlagNames; 16] = [
    ["OUT1", "OUT2", "OUT3", "OUT4", "OUT5", "OUT6", "OUT7", "OUT8"],
    ["OUT9", "OUT10", "OUT11", "OUT12", "OUT13", "OUT14", "OUT15", "OUT16"],
    ["OUT17", "OUT18", "OUT19", "OUT20", "OUT21", "OUT22", "OUT23", "OUT24"],
    ["OUT25", "OUT26", "OUT27", "OUT28", "OUT29", "OUT30", "OUT31", "OUT32"],
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    ["", "", "", "PO10", "PO11", "PO12", "ACK10", "ACK11"],
    ["", "", "", "PO20", "PO21", "PO22", "STB20", "STB21"],
    ["TCTRL1", "TCTRL2", "TCTRL3", "TCTRL4", "SCK1", "SCK2", "SCK3", ""],
    ["PORT0", "PORT1", "PORT2", "PORT3", "", "", "", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "SIGT", "SIGR", "", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "SIGT", "SIGR", "", ""],
    ["SIG1", "SIG2", "SIG3", "SIG4", "EDS1", "EDS2", "EDS3", "EDS4"],
    BLANK,
];

static REGIONS: [RegionLayout; 1] = [RegionLayout::new(&INPUTS, &OUTPUTS)];

pub static LAYOUT: BoardLayout = BoardLayout {
    model: "PCI-2724",
    regions: &REGIONS,
    board_id: Some(BoardIdLocation::low_nibble(REGION, 0x0f)),
};

/// One 8-point group of inputs or outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteGroup {
    Points1To8,
    Points9To16,
    Points17To24,
    Points25To32,
}

impl ByteGroup {
    fn offset(self) -> u64 {
        match self {
            ByteGroup::Points1To8 => 0x00,
            ByteGroup::Points9To16 => 0x01,
            ByteGroup::Points17To24 => 0x02,
            ByteGroup::Points25To32 => 0x03,
        }
    }
}

/// One 16-point group of inputs or outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordGroup {
    Points1To16,
    Points17To32,
}

impl WordGroup {
    fn offset(self) -> u64 {
        match self {
            WordGroup::Points1To16 => 0x00,
            WordGroup::Points17To32 => 0x02,
        }
    }
}

fn check_points(start: u32, count: usize) -> Result<()> {
    let last = start as u64 + count as u64;
    if start < 1 || count == 0 || last > u64::from(POINTS) + 1 {
        return Err(Error::InvalidChannel {
            channel: if start < 1 { start } else { (last - 1) as u32 },
            min: 1,
            max: POINTS,
        });
    }
    Ok(())
}

/// PCI-2724 digital I/O board.
#[derive(Debug)]
pub struct Pci2724<IO, AP = AllowAllPolicy> {
    driver: BoardDriver<IO, AP>,
}

impl<IO: PhysicalIo> Pci2724<IO> {
    pub fn open(descriptor: BoardDescriptor, io: IO) -> Result<Self> {
        Ok(Self::from_driver(BoardDriver::new(descriptor, LAYOUT, io)?))
    }
}

impl<IO: PhysicalIo, AP: AccessPolicy> Pci2724<IO, AP> {
    /// Wraps a driver opened with [`LAYOUT`].
    pub fn from_driver(driver: BoardDriver<IO, AP>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &BoardDriver<IO, AP> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut BoardDriver<IO, AP> {
        &mut self.driver
    }

    pub fn into_driver(self) -> BoardDriver<IO, AP> {
        self.driver
    }

    /// Clears every output and releases latch, ACK and STB control.
    pub fn initialize(&mut self) -> Result<()> {
        self.output_dword(0)?;
        self.set_latch_status("")?;
        self.set_ack_pulse_command("", "")?;
        self.set_stb_pulse_command("", "")
    }

    /// States of `count` inputs starting at point `start` (1-based).
    pub fn input_point(&mut self, start: u32, count: usize) -> Result<Vec<bool>> {
        check_points(start, count)?;
        let bits = self.input_dword()?.to_bits();
        let from = (start - 1) as usize;
        Ok(bits[from..from + count].to_vec())
    }

    /// Drives outputs from point `start` (1-based), keeping the other
    /// outputs as last written.
    pub fn output_point(&mut self, start: u32, states: &[bool]) -> Result<()> {
        check_points(start, states.len())?;
        let mut bits = self
            .driver
            .get_log_range(Direction::Out, REGION, 0x00, 4)?
            .to_bits();
        let from = (start - 1) as usize;
        bits[from..from + states.len()].copy_from_slice(states);
        self.driver
            .write(REGION, 0x00, &codec::bits_to_bytes(&bits))
    }

    pub fn input_byte(&mut self, group: ByteGroup) -> Result<RegisterValue> {
        self.driver.read(REGION, group.offset(), 1)
    }

    pub fn input_word(&mut self, group: WordGroup) -> Result<RegisterValue> {
        self.driver.read(REGION, group.offset(), 2)
    }

    pub fn input_dword(&mut self) -> Result<RegisterValue> {
        self.driver.read(REGION, 0x00, 4)
    }

    pub fn output_byte(&mut self, group: ByteGroup, value: u8) -> Result<()> {
        self.driver.write_u8(REGION, group.offset(), value)
    }

    pub fn output_word(&mut self, group: WordGroup, value: u16) -> Result<()> {
        self.driver.write_u16(REGION, group.offset(), value)
    }

    pub fn output_dword(&mut self, value: u32) -> Result<()> {
        self.driver.write_u32(REGION, 0x00, value)
    }

    /// Enables input latching for the named ports (`PORT0`..`PORT3`).
    pub fn set_latch_status(&mut self, ports: &str) -> Result<()> {
        self.driver.set_flag(REGION, LATCH, ports)
    }

    pub fn latch_status(&mut self) -> Result<RegisterValue> {
        self.driver.read(REGION, LATCH, 1)
    }

    pub fn ack_status(&mut self) -> Result<RegisterValue> {
        self.driver.read(REGION, ACK, 1)
    }

    /// Sets the ACK output level (`ACK10`/`ACK11`) and pulse (`PO1x`) flags.
    pub fn set_ack_pulse_command(&mut self, ack: &str, pulse: &str) -> Result<()> {
        self.driver.set_flag(REGION, ACK, &format!("{ack} {pulse}"))
    }

    pub fn stb_status(&mut self) -> Result<RegisterValue> {
        self.driver.read(REGION, STB, 1)
    }

    /// Sets the STB output level (`STB20`/`STB21`) and pulse (`PO2x`) flags.
    pub fn set_stb_pulse_command(&mut self, stb: &str, pulse: &str) -> Result<()> {
        self.driver.set_flag(REGION, STB, &format!("{stb} {pulse}"))
    }
}
