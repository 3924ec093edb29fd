use core::{
    fmt,
    ops::{Bound, RangeBounds},
};

use crate::{
    codec,
    error::{Error, Result},
    helpers::{AddrRange, range_span},
    register::ByteCell,
    types::{BLANK, FlagNames},
};

/// Value accepted by [`RegisterSequence::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    /// Packed little-endian, one byte per cell.
    Int(u64),
    /// Each cell is rebuilt from the names present in its own flag table.
    Names(Vec<String>),
    /// Values of cells with matching addresses are copied over.
    Mirror(RegisterSequence),
}

impl From<u64> for SetValue {
    fn from(value: u64) -> Self {
        SetValue::Int(value)
    }
}

impl From<u32> for SetValue {
    fn from(value: u32) -> Self {
        SetValue::Int(value.into())
    }
}

impl From<u8> for SetValue {
    fn from(value: u8) -> Self {
        SetValue::Int(value.into())
    }
}

impl From<&str> for SetValue {
    fn from(names: &str) -> Self {
        SetValue::Names(codec::split_flag_names(names).map(String::from).collect())
    }
}

impl From<&[&str]> for SetValue {
    fn from(names: &[&str]) -> Self {
        SetValue::Names(
            names
                .iter()
                .filter(|n| !n.is_empty())
                .map(|n| String::from(*n))
                .collect(),
        )
    }
}

impl From<Vec<String>> for SetValue {
    fn from(names: Vec<String>) -> Self {
        SetValue::Names(names.into_iter().filter(|n| !n.is_empty()).collect())
    }
}

impl From<RegisterSequence> for SetValue {
    fn from(other: RegisterSequence) -> Self {
        SetValue::Mirror(other)
    }
}

impl From<&RegisterSequence> for SetValue {
    fn from(other: &RegisterSequence) -> Self {
        SetValue::Mirror(other.clone())
    }
}

/// Ordered, contiguous run of [`ByteCell`]s forming one register bank.
///
/// Slices are detached copies: mutating a slice never touches the sequence
/// it came from. Writing operations rewrite cell values only; addresses and
/// flag tables are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterSequence {
    cells: Vec<ByteCell>,
}

impl RegisterSequence {
    /// Builds a zeroed sequence from a static flag table, assigning
    /// `base_address + index` to each cell.
    pub fn from_template(template: &'static [FlagNames], base_address: u64) -> Self {
        let cells = template
            .iter()
            .enumerate()
            .map(|(i, names)| ByteCell::new(base_address + i as u64, names))
            .collect();
        Self { cells }
    }

    /// Builds a zeroed sequence of `size` cells with no named bits.
    pub fn blank(base_address: u64, size: usize) -> Self {
        let cells = (0..size)
            .map(|i| ByteCell::new(base_address + i as u64, &BLANK))
            .collect();
        Self { cells }
    }

    /// Builds a sequence from explicitly addressed cells.
    ///
    /// # Errors
    /// * [`Error::NonContiguous`] - if addresses are not contiguous and increasing
    pub fn from_cells(cells: Vec<ByteCell>) -> Result<Self> {
        for pair in cells.windows(2) {
            let expected = pair[0].address() + 1;
            if pair[1].address() != expected {
                return Err(Error::NonContiguous {
                    expected,
                    found: pair[1].address(),
                });
            }
        }
        Ok(Self { cells })
    }

    /// Extends the sequence with blank cells up to `size` cells.
    pub(crate) fn pad_to(&mut self, base_address: u64, size: usize) {
        let start = self.cells.len();
        for i in start..size {
            self.cells
                .push(ByteCell::new(base_address + i as u64, &BLANK));
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Address of the first cell, or 0 for an empty sequence.
    pub fn start_address(&self) -> u64 {
        self.cells.first().map_or(0, ByteCell::address)
    }

    /// One past the address of the last cell.
    pub fn end_address(&self) -> u64 {
        self.start_address() + self.size() as u64
    }

    pub fn cells(&self) -> &[ByteCell] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = &ByteCell> {
        self.cells.iter()
    }

    fn span(&self, address: u64, len: usize) -> Result<(usize, usize)> {
        range_span(self.start_address(), self.size(), address, len)
    }

    /// Cell at `address`.
    pub fn cell(&self, address: u64) -> Result<&ByteCell> {
        let (start, _) = self.span(address, 1)?;
        Ok(&self.cells[start])
    }

    /// Detached single-cell sequence at `address`.
    pub fn at(&self, address: u64) -> Result<RegisterSequence> {
        self.slice(address..=address)
    }

    /// Detached copy of the cells whose addresses fall in `range`.
    ///
    /// # Errors
    /// * [`Error::IndexOutOfRange`] - if the range is empty or leaves the sequence
    pub fn slice(&self, range: impl RangeBounds<u64>) -> Result<RegisterSequence> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => self.start_address(),
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.end_address(),
        };
        let len = end.saturating_sub(start) as usize;
        let (from, to) = self.span(start, len)?;
        Ok(Self {
            cells: self.cells[from..to].to_vec(),
        })
    }

    /// Flag tables of all cells in order.
    pub fn flag_table(&self) -> Vec<FlagNames> {
        self.cells.iter().map(|c| *c.names()).collect()
    }

    /// Positional names of every bit, cell by cell.
    pub fn flag_names(&self) -> Vec<&'static str> {
        self.cells
            .iter()
            .flat_map(|c| c.names().iter().copied())
            .collect()
    }

    /// State of the first bit named `name`, or `None` if no cell has it.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.cells
            .iter()
            .find_map(|c| c.position(name).map(|i| c.bit(i)))
    }

    /// State of the first bit named `name`.
    ///
    /// # Errors
    /// * [`Error::UnknownFlagName`] - if no cell names a bit `name`
    pub fn flag(&self, name: &str) -> Result<bool> {
        self.get(name).ok_or_else(|| Error::UnknownFlagName {
            name: name.to_string(),
        })
    }

    /// Bit `index` of the whole sequence (bit `8 * j + i` is bit `i` of cell `j`).
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.cells.get(index / 8).map(|c| c.bit(index % 8))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(ByteCell::value).collect()
    }

    /// Little-endian unsigned value; the sequence must be 1, 2, 4 or 8 bytes.
    pub fn to_uint(&self) -> Result<u64> {
        codec::to_uint(&self.to_bytes())
    }

    /// Little-endian signed value; the sequence must be 1, 2, 4 or 8 bytes.
    pub fn to_int(&self) -> Result<i64> {
        codec::to_int(&self.to_bytes())
    }

    /// Upper-case hex of each byte in register order.
    pub fn to_hex(&self) -> String {
        self.cells
            .iter()
            .map(|c| format!("{:02X}", c.value()))
            .collect()
    }

    /// Binary of each byte (MSB first) in register order.
    pub fn to_binary_string(&self) -> String {
        self.cells
            .iter()
            .map(|c| format!("{:08b}", c.value()))
            .collect()
    }

    pub fn to_bits(&self) -> Vec<bool> {
        codec::bytes_to_bits(&self.to_bytes())
    }

    /// Space-joined names of every set, named bit.
    pub fn to_flags(&self) -> String {
        codec::active_flag_names(&self.to_bytes(), &self.flag_table())
    }

    /// Replaces the register contents.
    ///
    /// Names that match no flag of this sequence are dropped without error.
    ///
    /// # Errors
    /// * [`Error::ValueOverflow`] - if an integer does not fit the sequence width
    pub fn set(&mut self, value: impl Into<SetValue>) -> Result<()> {
        match value.into() {
            SetValue::Int(v) => self.set_uint(v),
            SetValue::Names(names) => {
                self.set_names(&names);
                Ok(())
            }
            SetValue::Mirror(other) => {
                self.set_from(&other);
                Ok(())
            }
        }
    }

    /// Packs `value` little-endian across the cells.
    pub fn set_uint(&mut self, value: u64) -> Result<()> {
        let bytes = codec::pack_uint(value, self.size())?;
        for (cell, byte) in self.cells.iter_mut().zip(bytes) {
            cell.set_value(byte);
        }
        Ok(())
    }

    /// Rebuilds every cell so that exactly the bits named in `names` are set.
    pub fn set_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.log_unmatched(names);
        for cell in &mut self.cells {
            let mask = cell.mask_for(names);
            cell.set_value(mask);
        }
    }

    /// Copies values from cells of `other` that share an address with this one.
    pub fn set_from(&mut self, other: &RegisterSequence) {
        for src in other.iter() {
            if let Some(dst) = self
                .cells
                .iter_mut()
                .find(|c| c.address() == src.address())
            {
                dst.set_value(src.value());
            }
        }
    }

    /// Sets the named bits, leaving every other bit unchanged.
    pub fn bit_on(&mut self, names: &str) {
        let names: Vec<&str> = codec::split_flag_names(names).collect();
        self.log_unmatched(&names);
        for cell in &mut self.cells {
            let mask = cell.mask_for(&names);
            cell.set_value(cell.value() | mask);
        }
    }

    /// Clears the named bits, leaving every other bit unchanged.
    pub fn bit_off(&mut self, names: &str) {
        let names: Vec<&str> = codec::split_flag_names(names).collect();
        self.log_unmatched(&names);
        for cell in &mut self.cells {
            let mask = cell.mask_for(&names);
            cell.set_value(cell.value() & !mask);
        }
    }

    fn log_unmatched<S: AsRef<str>>(&self, names: &[S]) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        let wanted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        if let Some(name) = codec::first_unmatched(&self.flag_table(), &wanted) {
            tracing::debug!(
                name,
                start = self.start_address(),
                "flag name matches no bit of register, ignored"
            );
        }
    }

    /// Overwrites the values of `data.len()` cells starting at `address`.
    pub(crate) fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<()> {
        let (start, end) = self.span(address, data.len())?;
        for (cell, &byte) in self.cells[start..end].iter_mut().zip(data) {
            cell.set_value(byte);
        }
        Ok(())
    }

    /// Borrowed view of `len` cells starting at `address`.
    pub(crate) fn window(&self, address: u64, len: usize) -> Result<&[ByteCell]> {
        let (start, end) = self.span(address, len)?;
        Ok(&self.cells[start..end])
    }

    /// Checks that `len` bytes at `address` are inside the sequence.
    pub(crate) fn check_range(&self, address: u64, len: usize) -> Result<AddrRange> {
        self.span(address, len)?;
        Ok(AddrRange::new(address, len))
    }

    /// Multi-line dump of every cell.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RegisterSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            writeln!(f, "{cell}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TWO_BYTE_TABLE, two_byte_register};

    #[test]
    fn template_assigns_contiguous_addresses() {
        let reg = RegisterSequence::from_template(TWO_BYTE_TABLE, 0x10);
        assert_eq!(reg.size(), 2);
        assert_eq!(reg.start_address(), 0x10);
        assert_eq!(reg.end_address(), 0x12);
        assert_eq!(reg.to_bytes(), vec![0, 0]);
        assert_eq!(reg.cell(0x11).unwrap().names()[0], "C");
    }

    #[test]
    fn explicit_cells_must_be_contiguous() {
        let ok = RegisterSequence::from_cells(vec![
            ByteCell::new(4, &TWO_BYTE_TABLE[0]),
            ByteCell::new(5, &TWO_BYTE_TABLE[1]),
        ]);
        assert_eq!(ok.unwrap().start_address(), 4);

        let gap = RegisterSequence::from_cells(vec![
            ByteCell::new(4, &TWO_BYTE_TABLE[0]),
            ByteCell::new(6, &TWO_BYTE_TABLE[1]),
        ]);
        assert!(matches!(
            gap,
            Err(Error::NonContiguous {
                expected: 5,
                found: 6
            })
        ));
    }

    #[test]
    fn named_bit_scenario() {
        let mut reg = two_byte_register();

        reg.set("A C").unwrap();
        assert_eq!(reg.to_bytes(), vec![0x01, 0x01]);

        reg.bit_on("B");
        assert_eq!(reg.to_bytes(), vec![0x03, 0x01]);

        reg.bit_off("A");
        assert_eq!(reg.to_bytes(), vec![0x02, 0x01]);

        assert_eq!(reg.to_flags(), "B C");
    }

    #[test]
    fn set_by_names_is_full_overwrite_and_drops_unknown() {
        let mut reg = two_byte_register();
        reg.set_uint(0xFFFF).unwrap();

        reg.set(&["B", "NOPE"][..]).unwrap();
        assert_eq!(reg.to_bytes(), vec![0x02, 0x00]);

        reg.set("").unwrap();
        assert_eq!(reg.to_bytes(), vec![0x00, 0x00]);
    }

    #[test]
    fn bit_on_then_off_restores_value() {
        let subsets = ["", "A", "B", "C", "A B", "A,C", "A B C", "ZZ"];
        for start in [0x0000u64, 0x0102, 0xFFFF, 0x8055] {
            for names in subsets {
                let mut reg = two_byte_register();
                reg.set_uint(start).unwrap();
                // Only bits that were clear can be restored by bit_off
                reg.bit_off(names);
                let cleared = reg.to_uint().unwrap();
                reg.bit_on(names);
                reg.bit_off(names);
                assert_eq!(reg.to_uint().unwrap(), cleared, "names={names:?}");
            }
        }
    }

    #[test]
    fn bit_on_leaves_siblings() {
        let mut reg = two_byte_register();
        reg.set_uint(0x80F0).unwrap();
        reg.bit_on("A");
        assert_eq!(reg.to_bytes(), vec![0xF1, 0x80]);
        reg.bit_off("C");
        assert_eq!(reg.to_bytes(), vec![0xF1, 0x80]);
    }

    #[test]
    fn set_by_int_packs_little_endian() {
        let mut reg = two_byte_register();
        reg.set(0x1234u64).unwrap();
        assert_eq!(reg.to_bytes(), vec![0x34, 0x12]);
        assert_eq!(reg.to_hex(), "3412");
        assert_eq!(reg.to_binary_string(), "0011010000010010");
        assert!(matches!(
            reg.set(0x1_0000u64),
            Err(Error::ValueOverflow { size: 2, .. })
        ));
    }

    #[test]
    fn set_from_merges_by_address() {
        let mut reg = two_byte_register();
        reg.set_uint(0xAAAA).unwrap();

        let mut other = RegisterSequence::from_template(TWO_BYTE_TABLE, 1);
        other.set_uint(0x0201).unwrap(); // cells at 1 and 2

        reg.set(&other).unwrap();
        // Address 0 untouched, address 1 copied, address 2 has no match
        assert_eq!(reg.to_bytes(), vec![0xAA, 0x01]);
        assert_eq!(reg.cell(1).unwrap().names()[0], "C");
    }

    #[test]
    fn slices_are_detached() {
        let mut reg = two_byte_register();
        reg.set_uint(0x0201).unwrap();

        let mut tail = reg.slice(1..2).unwrap();
        assert_eq!(tail.start_address(), 1);
        tail.set_uint(0xFF).unwrap();
        assert_eq!(reg.to_bytes(), vec![0x01, 0x02]);

        assert_eq!(reg.slice(0..=1).unwrap().size(), 2);
        assert_eq!(reg.slice(..).unwrap(), reg);
        assert_eq!(reg.at(0).unwrap().to_bytes(), vec![0x01]);
    }

    #[test]
    fn slice_out_of_range_is_error() {
        let reg = two_byte_register();
        assert!(matches!(
            reg.slice(1..3),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(reg.slice(1..1), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(reg.at(2), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn lookup_by_name() {
        let mut reg = two_byte_register();
        reg.set("B C").unwrap();
        assert_eq!(reg.get("A"), Some(false));
        assert_eq!(reg.get("B"), Some(true));
        assert_eq!(reg.get("C"), Some(true));
        assert_eq!(reg.get(""), None);
        assert_eq!(reg.get("D"), None);
        assert!(reg.flag("C").unwrap());
        assert!(matches!(
            reg.flag("D"),
            Err(Error::UnknownFlagName { name }) if name == "D"
        ));
        assert_eq!(reg.bit(8), Some(true));
        assert_eq!(reg.bit(16), None);
    }

    #[test]
    fn signed_view() {
        let mut reg = two_byte_register();
        reg.set_uint(0xFFFE).unwrap();
        assert_eq!(reg.to_int().unwrap(), -2);
        assert_eq!(reg.to_uint().unwrap(), 0xFFFE);
        assert_eq!(reg.to_bits().len(), 16);
    }

    #[test]
    fn render_dumps_each_cell() {
        let mut reg = two_byte_register();
        reg.set("A C").unwrap();
        let text = reg.render();
        assert!(text.contains("Address 0x00 : value = 0x01 (0b00000001)"));
        assert!(text.contains("Address 0x01 : value = 0x01 (0b00000001)"));
        assert!(text.contains("  0 : C = 1"));
    }
}
