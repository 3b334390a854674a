//! Caller-facing start options.

use crate::tier::VmTier;
use sandpit_api::types::{VmStartData, VmStartRequest};

/// Credential bundle of a started VM.
///
/// Carries a single-use token; hand it to a real-time client (or a browser)
/// to connect.
pub type SandboxStartData = VmStartData;

/// Overrides applied when starting a VM.
///
/// Every field is optional; unset fields are left for the control plane
/// to decide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// ISO 3166-1 alpha-2 country code used as a scheduling hint.
    ///
    /// Not a guarantee: the VM may still land elsewhere.
    pub ipcountry: Option<String>,
    /// Tier to start the VM at.
    pub vm_tier: Option<VmTier>,
    /// Seconds of inactivity before the VM hibernates.
    pub hibernation_timeout_seconds: Option<u32>,
}

impl StartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ipcountry(mut self, country: impl Into<String>) -> Self {
        self.ipcountry = Some(country.into());
        self
    }

    pub fn vm_tier(mut self, tier: VmTier) -> Self {
        self.vm_tier = Some(tier);
        self
    }

    pub fn hibernation_timeout_seconds(mut self, seconds: u32) -> Self {
        self.hibernation_timeout_seconds = Some(seconds);
        self
    }

    /// Wire form of these options.
    pub fn to_request(&self) -> VmStartRequest {
        VmStartRequest {
            ipcountry: self.ipcountry.clone(),
            tier: self.vm_tier.map(|tier| tier.name().to_string()),
            hibernation_timeout_seconds: self.hibernation_timeout_seconds,
        }
    }
}

/// Map optional start options to the optional start request body.
///
/// No options means no body at all, not an empty one.
pub fn start_request(opts: Option<&StartOptions>) -> Option<VmStartRequest> {
    opts.map(StartOptions::to_request)
}
