//! PCI-6204: two-channel 32-bit encoder counter.
//!
//! Region 0 holds one 16-byte block per channel (channel 2 at +0x10):
//! data at 0x00-0x03, mode at 0x04, preset/enable at 0x05, command at 0x06
//! and Z-phase control at 0x07. Region 1 carries the board id.
//!
//! The data register is shared by the counter preset and the comparator;
//! the `P/L` bit at 0x05 selects which one a write loads. That bit is
//! toggled through the output shadow so `/EN` is never disturbed.

use crate::{
    descriptor::BoardDescriptor,
    driver::BoardDriver,
    error::Result,
    io::PhysicalIo,
    layout::{BoardIdLocation, BoardLayout, RegionLayout},
    policy::{AccessPolicy, AllowAllPolicy},
    types::{BLANK, Direction, FlagNames},
    value::RegisterValue,
};

use super::check_channel;

const REGION: usize = 0;
const DATA: u64 = 0x00;
const MODE: u64 = 0x04;
const CONTROL: u64 = 0x05;
const COMMAND: u64 = 0x06;
const Z_MODE: u64 = 0x07;

const DATA_IN: [FlagNames; 4] = [
    ["CD0", "CD1", "CD2", "CD3", "CD4", "CD5", "CD6", "CD7"],
    ["CD8", "CD9", "CD10", "CD11", "CD12", "CD13", "CD14", "CD15"],
    ["CD16", "CD17", "CD18", "CD19", "CD20", "CD21", "CD22", "CD23"],
    ["CD24", "CD25", "CD26", "CD27", "CD28", "CD29", "CD30", "CD31"],
];

const DATA_OUT: [FlagNames; 4] = [
    ["WD0", "WD1", "WD2", "WD3", "WD4", "WD5", "WD6", "WD7"],
    ["WD8", "WD9", "WD10", "WD11", "WD12", "WD13", "WD14", "WD15"],
    ["WD16", "WD17", "WD18", "WD19", "WD20", "WD21", "WD22", "WD23"],
    ["WD24", "WD25", "WD26", "WD27", "WD28", "WD29", "WD30", "WD31"],
];

const MODE_FLAGS: FlagNames = ["SEL0", "SEL1", "MD0", "MD1", "DIR", "EQS", "", ""];
const STATUS_FLAGS: FlagNames = ["L2", "L3", "EQ", "EXLT", "C/B", "PERR", "", ""];

const fn channel_in() -> [FlagNames; 16] {
    [
        DATA_IN[0],
        DATA_IN[1],
        DATA_IN[2],
        DATA_IN[3],
        MODE_FLAGS,
        ["A", "B", "Z", "L1", "L2", "L3", "", ""],
        ["U/D", "CBF", "EQ", "EXLTS", "EQF", "PERR", "", ""],
        BLANK,
        STATUS_FLAGS,
        STATUS_FLAGS,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
    ]
}

const fn channel_out() -> [FlagNames; 16] {
    [
        DATA_OUT[0],
        DATA_OUT[1],
        DATA_OUT[2],
        DATA_OUT[3],
        MODE_FLAGS,
        ["P/L", "/EN", "", "", "", "", "", ""],
        ["CC0", "CC1", "", "", "", "", "", ""],
        ["CLS0", "CLS1", "LTS0", "LTS1", "ZP", "", "", ""],
        BLANK,
        STATUS_FLAGS,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
        BLANK,
    ]
}

const fn two_channels(block: [FlagNames; 16]) -> [FlagNames; 32] {
    let mut table = [BLANK; 32];
    let mut i = 0;
    while i < 16 {
        table[i] = block[i];
        table[i + 16] = block[i];
        i += 1;
    }
    table
}

static COUNTER_IN: [FlagNames; 32] = two_channels(channel_in());
static COUNTER_OUT: [FlagNames; 32] = two_channels(channel_out());

static TIMER_IN: [FlagNames; 16] = [
    ["TD1", "TD2", "TD3", "TD4", "", "", "", ""],
    ["", "", "", "", "SIGT", "", "", ""],
    ["", "", "", "", "SIGT", "", "", ""],
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    BLANK,
    ["BID0", "BID1", "BID2", "BID3", "", "", "", ""],
];

static TIMER_OUT: [FlagNames; 3] = [
    ["TCTRL1", "TCTRL2", "TCTRL3", "TCTRL4", "SCK1", "SCK2", "SCK3", ""],
    BLANK,
    ["", "", "", "", "SIGT", "", "", ""],
];

static REGIONS: [RegionLayout; 2] = [
    RegionLayout::new(&COUNTER_IN, &COUNTER_OUT),
    RegionLayout::new(&TIMER_IN, &TIMER_OUT),
];

pub static LAYOUT: BoardLayout = BoardLayout {
    model: "PCI-6204",
    regions: &REGIONS,
    board_id: Some(BoardIdLocation::low_nibble(1, 0x0f)),
};

pub const CHANNELS: u32 = 2;

/// Counting mode of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterMode {
    /// Space-separated `SEL0`/`SEL1`/`MD0`/`MD1` flags.
    pub mode: String,
    /// Count down instead of up.
    pub direction: bool,
    /// Comparator match output enabled.
    pub equal: bool,
}

/// Z-phase handling of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZMode {
    /// `CLS0`, `CLS1` or empty.
    pub clear_condition: String,
    /// `LTS0`, `LTS1` or empty.
    pub latch_condition: String,
    /// Z input active low.
    pub z_polarity: bool,
}

fn offset_for(channel: u32, offset: u64) -> Result<u64> {
    check_channel(channel, 1, CHANNELS)?;
    Ok(offset + 0x10 * u64::from(channel - 1))
}

/// PCI-6204 encoder counter board.
#[derive(Debug)]
pub struct Pci6204<IO, AP = AllowAllPolicy> {
    driver: BoardDriver<IO, AP>,
}

impl<IO: PhysicalIo> Pci6204<IO> {
    pub fn open(descriptor: BoardDescriptor, io: IO) -> Result<Self> {
        Ok(Self::from_driver(BoardDriver::new(descriptor, LAYOUT, io)?))
    }
}

impl<IO: PhysicalIo, AP: AccessPolicy> Pci6204<IO, AP> {
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

    /// Zeroes both counters, parks both comparators at -1 and enables
    /// counting with default modes.
    pub fn initialize(&mut self) -> Result<()> {
        for channel in 1..=CHANNELS {
            self.set_counter(channel, 0)?;
            self.set_comparator(channel, -1)?;
            self.set_mode(channel, &CounterMode::default())?;
            self.enable_count(channel)?;
            self.set_z_mode(channel, &ZMode::default())?;
        }
        Ok(())
    }

    /// Issues the software reset command.
    pub fn reset(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, COMMAND)?;
        self.driver.set_flag(REGION, offset, "CC0 CC1")
    }

    pub fn set_mode(&mut self, channel: u32, mode: &CounterMode) -> Result<()> {
        let offset = offset_for(channel, MODE)?;
        let mut flags = mode.mode.clone();
        if mode.direction {
            flags.push_str(" DIR");
        }
        if mode.equal {
            flags.push_str(" EQS");
        }
        self.driver.set_flag(REGION, offset, &flags)
    }

    /// Reads the mode register back from the board.
    pub fn get_mode(&mut self, channel: u32) -> Result<CounterMode> {
        let offset = offset_for(channel, MODE)?;
        let value = self.driver.read(REGION, offset, 1)?;
        let mode = value
            .to_flags()
            .split(' ')
            .filter(|f| !f.is_empty() && *f != "DIR" && *f != "EQS")
            .collect::<Vec<_>>()
            .join(" ");
        Ok(CounterMode {
            mode,
            direction: value.flag("DIR")?,
            equal: value.flag("EQS")?,
        })
    }

    pub fn set_z_mode(&mut self, channel: u32, z: &ZMode) -> Result<()> {
        let offset = offset_for(channel, Z_MODE)?;
        let mut flags = format!("{} {}", z.clear_condition, z.latch_condition);
        if z.z_polarity {
            flags.push_str(" ZP");
        }
        self.driver.set_flag(REGION, offset, &flags)
    }

    /// Z-phase settings as last written. The register is write-only.
    pub fn get_z_mode(&self, channel: u32) -> Result<ZMode> {
        let offset = offset_for(channel, Z_MODE)?;
        let value = self.driver.get_log(Direction::Out, REGION, offset)?;
        let first_of = |a: &str, b: &str| -> Result<String> {
            Ok(if value.flag(a)? {
                a.to_string()
            } else if value.flag(b)? {
                b.to_string()
            } else {
                String::new()
            })
        };
        Ok(ZMode {
            clear_condition: first_of("CLS0", "CLS1")?,
            latch_condition: first_of("LTS0", "LTS1")?,
            z_polarity: value.flag("ZP")?,
        })
    }

    pub fn enable_count(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, CONTROL)?;
        self.driver.bit_off(REGION, offset, "/EN")
    }

    pub fn disable_count(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, CONTROL)?;
        self.driver.bit_on(REGION, offset, "/EN")
    }

    /// Routes data writes to the counter preset.
    pub fn set_counter_mode(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, CONTROL)?;
        self.driver.bit_off(REGION, offset, "P/L")
    }

    /// Routes data writes to the comparator.
    pub fn set_comparator_mode(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, CONTROL)?;
        self.driver.bit_on(REGION, offset, "P/L")
    }

    /// Presets the counter.
    pub fn set_counter(&mut self, channel: u32, count: i32) -> Result<()> {
        let offset = offset_for(channel, DATA)?;
        self.set_counter_mode(channel)?;
        self.driver.write(REGION, offset, &count.to_le_bytes())
    }

    /// Loads the comparator.
    ///
    /// There is no matching getter. Counter preset and comparator share the
    /// data register, so the output log holds whichever was written last, and
    /// the board has no path to read the comparator back.
    pub fn set_comparator(&mut self, channel: u32, count: i32) -> Result<()> {
        let offset = offset_for(channel, DATA)?;
        self.set_comparator_mode(channel)?;
        self.driver.write(REGION, offset, &count.to_le_bytes())
    }

    /// Latches the counter and reads it.
    pub fn get_counter(&mut self, channel: u32) -> Result<i32> {
        let offset = offset_for(channel, DATA)?;
        self.set_counter_mode(channel)?;
        self.latch(channel)?;
        self.driver.read(REGION, offset, 4)?.to_i32()
    }

    /// Copies the live count into the data register.
    pub fn latch(&mut self, channel: u32) -> Result<()> {
        let offset = offset_for(channel, COMMAND)?;
        self.driver.set_flag(REGION, offset, "CC1")
    }

    /// Status bytes at 0x05-0x06 (`U/D`, `CBF`, `EQ`, ...).
    pub fn get_status(&mut self, channel: u32) -> Result<RegisterValue> {
        let offset = offset_for(channel, CONTROL)?;
        self.driver.read(REGION, offset, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::RegionDescriptor,
        error::Error,
        io::{IoAddress, Operation, SimulatedIo},
        types::RegionKind,
    };

    const BASE: u64 = 0xc000;
    const TIMER_BASE: u64 = 0xc100;

    fn board() -> Pci6204<SimulatedIo> {
        let desc = BoardDescriptor::new(
            "PCI-6204",
            vec![
                RegionDescriptor::new(RegionKind::Port, BASE, 32),
                RegionDescriptor::new(RegionKind::Port, TIMER_BASE, 16),
            ],
        );
        let mut io = SimulatedIo::new();
        io.set_input(IoAddress::Port(TIMER_BASE + 0x0f), &[0x01]);
        Pci6204::open(desc, io).unwrap()
    }

    fn out(board: &Pci6204<SimulatedIo>, offset: u64) -> u8 {
        board.driver().io().output(IoAddress::Port(BASE + offset))
    }

    #[test]
    fn board_id_from_second_region() {
        assert_eq!(board().driver().board_id(), Some(1));
    }

    #[test]
    fn tables_repeat_per_channel() {
        assert_eq!(COUNTER_OUT[0x15], ["P/L", "/EN", "", "", "", "", "", ""]);
        assert_eq!(COUNTER_IN[0x14], MODE_FLAGS);
        assert_eq!(COUNTER_IN[0x0f], BLANK);
    }

    #[test]
    fn channel_is_checked() {
        let mut b = board();
        for channel in [0, 3] {
            assert!(matches!(
                b.reset(channel),
                Err(Error::InvalidChannel { min: 1, max: 2, .. })
            ));
        }
        assert!(b.get_z_mode(3).is_err());
    }

    #[test]
    fn mode_is_written_as_flags() {
        let mut b = board();
        let mode = CounterMode {
            mode: "SEL0 MD1".into(),
            direction: true,
            equal: false,
        };
        b.set_mode(2, &mode).unwrap();
        assert_eq!(out(&b, 0x14), 0b0001_1001);

        b.driver_mut()
            .io_mut()
            .set_input(IoAddress::Port(BASE + 0x14), &[0b0011_1001]);
        let read = b.get_mode(2).unwrap();
        assert_eq!(read.mode, "SEL0 MD1");
        assert!(read.direction);
        assert!(read.equal);
    }

    #[test]
    fn data_log_holds_last_preset_or_comparator() {
        let mut b = board();
        b.set_counter(1, -5).unwrap();
        b.set_comparator(1, 1000).unwrap();

        let data = b
            .driver()
            .get_log_range(Direction::Out, REGION, DATA, 4)
            .unwrap();
        assert_eq!(data.to_i32().unwrap(), 1000);
        assert_eq!(out(&b, 0x05) & 0x01, 0x01, "P/L selects the comparator");
    }

    #[test]
    fn z_mode_reads_back_from_output_shadow() {
        let mut b = board();
        let z = ZMode {
            clear_condition: "CLS1".into(),
            latch_condition: "LTS0".into(),
            z_polarity: true,
        };
        b.set_z_mode(1, &z).unwrap();
        assert_eq!(out(&b, 0x07), 0b0001_0110);
        assert_eq!(b.get_z_mode(1).unwrap(), z);
        assert_eq!(b.get_z_mode(2).unwrap(), ZMode::default());
    }

    #[test]
    fn preset_and_comparator_switch_only_pl() {
        let mut b = board();
        b.disable_count(1).unwrap();
        assert_eq!(out(&b, 0x05), 0x02);

        b.set_comparator(1, -1).unwrap();
        assert_eq!(out(&b, 0x05), 0x03);
        assert_eq!(b.driver().io().outputs(IoAddress::Port(BASE), 4), vec![0xFF; 4]);

        b.set_counter(1, 1000).unwrap();
        assert_eq!(out(&b, 0x05), 0x02);
        assert_eq!(
            b.driver().get_log_range(Direction::Out, 0, 0, 4).unwrap().to_i32().unwrap(),
            1000
        );

        b.enable_count(1).unwrap();
        assert_eq!(out(&b, 0x05), 0x00);
    }

    #[test]
    fn get_counter_latches_before_reading() {
        let mut b = board();
        b.driver_mut()
            .io_mut()
            .set_input(IoAddress::Port(BASE + 0x10), &(-5i32).to_le_bytes());
        b.driver_mut().io_mut().clear_operations();

        assert_eq!(b.get_counter(2).unwrap(), -5);

        let ops = b.driver().io().operations();
        assert_eq!(
            ops[1],
            Operation::Write {
                address: IoAddress::Port(BASE + 0x16),
                data: vec![0x02]
            }
        );
        assert!(matches!(
            &ops[2],
            Operation::Read { address, data } if *address == IoAddress::Port(BASE + 0x10) && data.len() == 4
        ));
    }

    #[test]
    fn initialize_and_reset() {
        let mut b = board();
        b.initialize().unwrap();
        for base in [0x00, 0x10] {
            assert_eq!(out(&b, base + 0x05), 0x01, "comparator mode kept, counting enabled");
            assert_eq!(out(&b, base + 0x04), 0x00);
            assert_eq!(out(&b, base + 0x07), 0x00);
        }
        b.reset(1).unwrap();
        assert_eq!(out(&b, 0x06), 0x03);

        b.driver_mut()
            .io_mut()
            .set_input(IoAddress::Port(BASE + 0x05), &[0x00, 0x04]);
        assert!(b.get_status(1).unwrap().flag("EQ").unwrap());
    }
}
