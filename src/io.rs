//! Boundary to the physical bus.
//!
//! The crate never touches hardware itself. A [`PhysicalIo`] implementation
//! performs port or memory-mapped accesses; its errors are passed through to
//! callers as [`Error::Io`](crate::Error::Io) without translation.

use std::collections::{BTreeMap, VecDeque};
use std::io;

use crate::types::RegionKind;

/// Bus address of one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IoAddress {
    /// Absolute I/O port.
    Port(u64),
    /// Offset into a memory-mapped PCI BAR.
    Bar { bar: usize, offset: u64 },
}

impl IoAddress {
    /// Address of `offset` in a region of `kind` starting at bus address `base`.
    pub fn for_region(kind: RegionKind, region: usize, base: u64, offset: u64) -> Self {
        match kind {
            RegionKind::Port => IoAddress::Port(base + offset),
            RegionKind::Memory => IoAddress::Bar {
                bar: region,
                offset,
            },
        }
    }

    /// Address `n` bytes further on.
    pub fn add(self, n: u64) -> Self {
        match self {
            IoAddress::Port(port) => IoAddress::Port(port + n),
            IoAddress::Bar { bar, offset } => IoAddress::Bar {
                bar,
                offset: offset + n,
            },
        }
    }
}

/// Raw read/write primitive for one board.
pub trait PhysicalIo {
    /// Reads `buf.len()` bytes starting at `address` in a single bus access.
    fn read_physical(&mut self, address: IoAddress, buf: &mut [u8]) -> io::Result<()>;
    /// Writes `data` starting at `address` in a single bus access.
    fn write_physical(&mut self, address: IoAddress, data: &[u8]) -> io::Result<()>;
}

impl<T: PhysicalIo + ?Sized> PhysicalIo for Box<T> {
    fn read_physical(&mut self, address: IoAddress, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_physical(address, buf)
    }

    fn write_physical(&mut self, address: IoAddress, data: &[u8]) -> io::Result<()> {
        (**self).write_physical(address, data)
    }
}

/// Access recorded by [`SimulatedIo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read { address: IoAddress, data: Vec<u8> },
    Write { address: IoAddress, data: Vec<u8> },
}

/// In-memory register file standing in for a board.
///
/// Reads come from the input plane and writes land in the output plane, the
/// way most Interface boards wire separate input and output latches to the
/// same offsets. Unset bytes read as zero.
#[derive(Debug, Default)]
pub struct SimulatedIo {
    inputs: BTreeMap<IoAddress, u8>,
    outputs: BTreeMap<IoAddress, u8>,
    /// Per-address values served before falling back to `inputs`.
    scripted: BTreeMap<IoAddress, VecDeque<u8>>,
    operations: Vec<Operation>,
    fail_next_read: Option<io::ErrorKind>,
    fail_next_write: Option<io::ErrorKind>,
}

impl SimulatedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets input bytes starting at `address`.
    pub fn set_input(&mut self, address: IoAddress, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.inputs.insert(address.add(i as u64), byte);
        }
    }

    /// Queues successive values for one input byte. Each read consumes one;
    /// the last consumed value stays in the input plane.
    pub fn queue_input(&mut self, address: IoAddress, values: impl IntoIterator<Item = u8>) {
        self.scripted.entry(address).or_default().extend(values);
    }

    /// Last byte written at `address`, or zero.
    pub fn output(&self, address: IoAddress) -> u8 {
        self.outputs.get(&address).copied().unwrap_or(0)
    }

    /// `len` output bytes starting at `address`.
    pub fn outputs(&self, address: IoAddress, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.output(address.add(i as u64))).collect()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    /// Makes the next read fail with `kind`.
    pub fn fail_next_read(&mut self, kind: io::ErrorKind) {
        self.fail_next_read = Some(kind);
    }

    /// Makes the next write fail with `kind`.
    pub fn fail_next_write(&mut self, kind: io::ErrorKind) {
        self.fail_next_write = Some(kind);
    }

    fn next_input(&mut self, address: IoAddress) -> u8 {
        if let Some(byte) = self.scripted.get_mut(&address).and_then(VecDeque::pop_front) {
            self.inputs.insert(address, byte);
        }
        self.inputs.get(&address).copied().unwrap_or(0)
    }
}

impl PhysicalIo for SimulatedIo {
    fn read_physical(&mut self, address: IoAddress, buf: &mut [u8]) -> io::Result<()> {
        if let Some(kind) = self.fail_next_read.take() {
            return Err(io::Error::new(kind, "simulated read failure"));
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.next_input(address.add(i as u64));
        }
        self.operations.push(Operation::Read {
            address,
            data: buf.to_vec(),
        });
        Ok(())
    }

    fn write_physical(&mut self, address: IoAddress, data: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.fail_next_write.take() {
            return Err(io::Error::new(kind, "simulated write failure"));
        }
        for (i, &byte) in data.iter().enumerate() {
            self.outputs.insert(address.add(i as u64), byte);
        }
        self.operations.push(Operation::Write {
            address,
            data: data.to_vec(),
        });
        Ok(())
    }
}
