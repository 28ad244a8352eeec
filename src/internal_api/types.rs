use serde::{Deserialize, Serialize};

use crate::model::{device::Device, user::UserSummary};

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    /// Absent flips the current setting.
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// `{success, user, message}` plus the device data relevant to the action.
#[derive(Debug, Serialize)]
pub struct DeviceAdminResponse {
    pub success: bool,
    pub user: UserSummary,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Device>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
}
