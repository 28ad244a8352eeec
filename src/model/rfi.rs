use serde::{Deserialize, Serialize};

use crate::chainage::Located;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RfiStatus {
    New,
    InProgress,
    Completed,
    Rejected,
}

impl Default for RfiStatus {
    fn default() -> Self {
        RfiStatus::New
    }
}

/// Request for inspection: one daily-work record at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rfi {
    pub id: String,
    pub number: String,
    pub location: String, // chainage text, point or range
    pub description: Option<String>,
    #[serde(default)]
    pub status: RfiStatus,
    pub created_ts: i64,
}

impl Located for Rfi {
    fn location_text(&self) -> &str {
        &self.location
    }

    fn sort_key(&self) -> &str {
        &self.number
    }
}
