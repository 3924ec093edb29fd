//! Board descriptors: the bus windows a board occupies.
//!
//! Descriptors are produced by device discovery, which lives outside this
//! crate, or loaded from TOML for fixed installations and tests.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    helpers::AddrRange,
    types::RegionKind,
};

/// Sub-window of a region that may be accessed, relative to the region base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRange {
    pub offset: u64,
    pub size: usize,
}

/// One BAR or I/O port block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub kind: RegionKind,
    /// Bus address of offset 0.
    pub base: u64,
    pub size: usize,
    /// Accessible windows. Empty means the whole region.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid: Vec<ValidRange>,
}

impl RegionDescriptor {
    pub fn new(kind: RegionKind, base: u64, size: usize) -> Self {
        Self {
            kind,
            base,
            size,
            valid: Vec::new(),
        }
    }

    /// Accessible offset ranges of the region.
    pub fn valid_ranges(&self) -> Vec<AddrRange> {
        if self.valid.is_empty() {
            return vec![AddrRange::new(0, self.size)];
        }
        self.valid
            .iter()
            .map(|v| AddrRange::new(v.offset, v.size))
            .collect()
    }
}

/// Identification and bus layout of one installed board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDescriptor {
    pub model: String,
    /// PCI device id.
    #[serde(default)]
    pub device: u32,
    /// Bus location, informational only.
    #[serde(default)]
    pub slot: String,
    pub regions: Vec<RegionDescriptor>,
}

impl BoardDescriptor {
    pub fn new(model: impl Into<String>, regions: Vec<RegionDescriptor>) -> Self {
        Self {
            model: model.into(),
            device: 0,
            slot: String::new(),
            regions,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::DescriptorFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn region(&self, region: usize) -> Result<&RegionDescriptor> {
        self.regions.get(region).ok_or(Error::UnknownRegion {
            region,
            count: self.regions.len(),
        })
    }
}
