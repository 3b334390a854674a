//! VM capacity tiers.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named capacity class a sandbox VM can run at.
///
/// The set is closed. Variants are declared smallest first and
/// [`VmTier::ALL`] keeps that order, which [`VmTier::from_specs`] relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VmTier {
    /// 1 CPU, 2 GiB RAM, 20 GB disk
    Pico,
    /// 2 CPU, 4 GiB RAM, 20 GB disk
    Nano,
    /// 4 CPU, 8 GiB RAM, 20 GB disk
    Micro,
    /// 8 CPU, 16 GiB RAM, 30 GB disk
    Small,
    /// 16 CPU, 32 GiB RAM, 40 GB disk
    Medium,
    /// 32 CPU, 64 GiB RAM, 50 GB disk
    Large,
    /// 64 CPU, 128 GiB RAM, 50 GB disk
    XLarge,
}

/// Minimum resources a caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VmSpecs {
    pub cpu: u32,
    pub mem_gib: u32,
    pub disk_gb: Option<u32>,
}

impl VmSpecs {
    /// Specs without a disk requirement.
    pub fn new(cpu: u32, mem_gib: u32) -> Self {
        Self {
            cpu,
            mem_gib,
            disk_gb: None,
        }
    }

    /// Add a disk requirement.
    pub fn disk_gb(mut self, disk_gb: u32) -> Self {
        self.disk_gb = Some(disk_gb);
        self
    }
}

impl VmTier {
    /// Every tier, smallest first.
    pub const ALL: [VmTier; 7] = [
        VmTier::Pico,
        VmTier::Nano,
        VmTier::Micro,
        VmTier::Small,
        VmTier::Medium,
        VmTier::Large,
        VmTier::XLarge,
    ];

    /// Wire name of the tier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pico => "Pico",
            Self::Nano => "Nano",
            Self::Micro => "Micro",
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::XLarge => "XLarge",
        }
    }

    pub fn cpu_cores(self) -> u32 {
        self.specs().0
    }

    pub fn memory_gib(self) -> u32 {
        self.specs().1
    }

    pub fn disk_gb(self) -> u32 {
        self.specs().2
    }

    fn specs(self) -> (u32, u32, u32) {
        match self {
            Self::Pico => (1, 2, 20),
            Self::Nano => (2, 4, 20),
            Self::Micro => (4, 8, 20),
            Self::Small => (8, 16, 30),
            Self::Medium => (16, 32, 40),
            Self::Large => (32, 64, 50),
            Self::XLarge => (64, 128, 50),
        }
    }

    /// Look a tier up by its exact wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.name() == name)
            .ok_or_else(|| CoreError::UnknownTier(name.to_string()))
    }

    /// The smallest tier meeting every given minimum, if any.
    pub fn from_specs(specs: VmSpecs) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| {
            tier.cpu_cores() >= specs.cpu
                && tier.memory_gib() >= specs.mem_gib
                && specs.disk_gb.map_or(true, |disk| tier.disk_gb() >= disk)
        })
    }
}

impl fmt::Display for VmTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VmTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
