use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fingerprint::RequestFingerprint;
use crate::model::device::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Only an identical fingerprint counts as the same device.
    Exact,
    /// Identical fingerprint, or same browser family + platform + form factor.
    FamilyPlatform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpScope {
    Exact,
    /// /24 for IPv4, /64 for IPv6.
    Subnet,
    Ignore,
}

impl FromStr for MatchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchStrategy::Exact),
            "family_platform" | "fuzzy" => Ok(MatchStrategy::FamilyPlatform),
            other => Err(anyhow::anyhow!("unknown device match strategy '{other}'")),
        }
    }
}

impl FromStr for IpScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(IpScope::Exact),
            "subnet" => Ok(IpScope::Subnet),
            "ignore" | "none" => Ok(IpScope::Ignore),
            other => Err(anyhow::anyhow!("unknown device ip scope '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatchPolicy {
    pub strategy: MatchStrategy,
    pub ip_scope: IpScope,
}

impl Default for DeviceMatchPolicy {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::FamilyPlatform,
            ip_scope: IpScope::Subnet,
        }
    }
}

impl DeviceMatchPolicy {
    /// Whether a login fingerprint belongs to an already registered device.
    /// Unknown browsers or platforms only ever match on the exact id.
    pub fn is_same_device(&self, known: &Device, incoming: &RequestFingerprint) -> bool {
        if known.device_id == incoming.device_id {
            return true;
        }

        match self.strategy {
            MatchStrategy::Exact => false,
            MatchStrategy::FamilyPlatform => {
                let known = known.traits();
                let incoming = &incoming.traits;
                known.is_browser_known()
                    && known.is_platform_known()
                    && known.browser_family == incoming.browser_family
                    && known.platform == incoming.platform
                    && known.device_type == incoming.device_type
            }
        }
    }
}
