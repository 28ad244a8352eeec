use serde::{Deserialize, Serialize};

use crate::model::{device::BlockedDeviceInfo, device::Device, user::UserSummary};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserSummary,
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: Option<String>,
}

impl LoginRequest {
    pub fn remember(&self) -> bool {
        matches!(
            self.remember.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("on") | Some("yes")
        )
    }
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub device_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_device_info: Option<BlockedDeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub new_device: bool,
    pub track_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserSummary,
    pub device: Device,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}
