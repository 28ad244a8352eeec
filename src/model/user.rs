use serde::{Deserialize, Serialize};

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub single_device_login_enabled: bool,
    pub created_ts: i64,
    #[serde(default)]
    pub devices_reset_ts: Option<i64>,
    #[serde(default)]
    pub devices_reset_reason: Option<String>,
}

impl User {
    pub fn new(email: &str, name: Option<String>, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            name,
            password_hash: Some(password_hash),
            single_device_login_enabled: true,
            created_ts: chrono::Utc::now().timestamp(),
            devices_reset_ts: None,
            devices_reset_reason: None,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            single_device_login_enabled: self.single_device_login_enabled,
            devices_reset_ts: self.devices_reset_ts,
        }
    }
}

/// User fields safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub single_device_login_enabled: bool,
    pub devices_reset_ts: Option<i64>,
}
