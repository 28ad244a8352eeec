use serde::{Deserialize, Serialize};

use crate::device::fingerprint::RequestFingerprint;
use crate::device::user_agent::{DeviceTraits, DeviceType};

/// A browser/client previously seen for a user. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: String,        // UUID, record key
    pub user_id: String,   // FK → User.id
    pub device_id: String, // fingerprint hash
    pub device_name: String,
    pub user_agent_raw: Option<String>,
    pub platform: String,
    #[serde(default)]
    pub platform_version: Option<String>,
    pub browser_family: String,
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    pub ip_address: Option<String>,
    #[serde(default)]
    pub accept_language: Option<String>,
    pub is_active: bool,
    pub session_id: Option<String>,
    pub created_ts: i64,
    pub last_seen_ts: i64,
    #[serde(default)]
    pub deactivated_ts: Option<i64>,
    #[serde(default)]
    pub deactivation_reason: Option<String>,
}

impl Device {
    pub fn from_fingerprint(user_id: &str, fp: &RequestFingerprint) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            device_id: fp.device_id.clone(),
            device_name: fp.traits.display_name(),
            user_agent_raw: fp.user_agent.clone(),
            platform: fp.traits.platform.clone(),
            platform_version: fp.traits.platform_version.clone(),
            browser_family: fp.traits.browser_family.clone(),
            browser_version: fp.traits.browser_version.clone(),
            device_type: fp.traits.device_type,
            ip_address: fp.ip.map(|ip| ip.to_string()),
            accept_language: fp.accept_language.clone(),
            is_active: true,
            session_id: None,
            created_ts: now,
            last_seen_ts: now,
            deactivated_ts: None,
            deactivation_reason: None,
        }
    }

    pub fn traits(&self) -> DeviceTraits {
        DeviceTraits {
            browser_family: self.browser_family.clone(),
            browser_version: self.browser_version.clone(),
            platform: self.platform.clone(),
            platform_version: self.platform_version.clone(),
            device_type: self.device_type,
        }
    }

    /// Refresh the row after a login that was recognised as this device.
    pub fn touch(&mut self, fp: &RequestFingerprint) {
        self.last_seen_ts = chrono::Utc::now().timestamp();
        self.device_id = fp.device_id.clone();
        if let Some(ip) = fp.ip {
            self.ip_address = Some(ip.to_string());
        }
        if fp.user_agent.is_some() {
            self.user_agent_raw = fp.user_agent.clone();
            self.browser_version = fp.traits.browser_version.clone();
            self.platform_version = fp.traits.platform_version.clone();
        }
        self.is_active = true;
        self.deactivated_ts = None;
        self.deactivation_reason = None;
    }

    pub fn deactivate(&mut self, reason: &str) {
        self.is_active = false;
        self.session_id = None;
        self.deactivated_ts = Some(chrono::Utc::now().timestamp());
        self.deactivation_reason = Some(reason.to_string());
    }

    pub fn blocked_info(&self) -> BlockedDeviceInfo {
        BlockedDeviceInfo {
            device_name: self.device_name.clone(),
            browser: self.browser_family.clone(),
            browser_version: self.browser_version.clone(),
            platform: self.platform.clone(),
        }
    }
}

/// What the login page shows about the device holding the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockedDeviceInfo {
    pub device_name: String,
    pub browser: String,
    pub browser_version: Option<String>,
    pub platform: String,
}
