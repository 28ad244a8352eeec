use serde::{Deserialize, Serialize};

use crate::chainage::{parse_list_lenient, range_from_bounds, ChainageScope};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionStatus {
    Draft,
    Submitted,
    UnderReview,
    Resolved,
    Rejected,
}

impl Default for ObjectionStatus {
    fn default() -> Self {
        ObjectionStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objection {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ObjectionStatus,
    /// Comma separated, e.g. "K35+897, K36+987".
    #[serde(default)]
    pub specific_chainages: Option<String>,
    #[serde(default)]
    pub chainage_from: Option<String>,
    #[serde(default)]
    pub chainage_to: Option<String>,
    #[serde(default)]
    pub rfi_ids: Vec<String>,
    pub created_by: String,
    pub created_ts: i64,
}

impl Objection {
    /// Stored fields were validated on create, so unreadable leftovers are skipped.
    pub fn scope(&self) -> ChainageScope {
        let specific = self
            .specific_chainages
            .as_deref()
            .map(parse_list_lenient)
            .unwrap_or_default();
        let range = match (self.chainage_from.as_deref(), self.chainage_to.as_deref()) {
            (Some(from), Some(to)) => range_from_bounds(from, to).ok(),
            _ => None,
        };
        ChainageScope { specific, range }
    }
}
