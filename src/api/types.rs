use serde::{Deserialize, Serialize};

use crate::{
    chainage::MatchType,
    model::{objection::ObjectionStatus, rfi::Rfi, rfi::RfiStatus},
};

#[derive(Debug, Deserialize)]
pub struct CreateRfiRequest {
    pub number: String,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<RfiStatus>,
}

#[derive(Debug, Serialize)]
pub struct RfiListResponse {
    pub count: usize,
    pub rfis: Vec<Rfi>,
}

#[derive(Debug, Deserialize)]
pub struct CreateObjectionRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ObjectionStatus>,
    #[serde(default)]
    pub specific_chainages: Option<String>,
    #[serde(default)]
    pub chainage_from: Option<String>,
    #[serde(default)]
    pub chainage_to: Option<String>,
    #[serde(default)]
    pub rfi_ids: Vec<String>,
}

/// `GET /suggest-rfis` parameters. `chainage_from` alone may hold a
/// comma-separated list or a textual range.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub chainage_from: Option<String>,
    #[serde(default)]
    pub chainage_to: Option<String>,
    #[serde(default)]
    pub specific_chainages: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RfiSuggestion {
    pub id: String,
    pub number: String,
    pub location: String,
}

impl From<&Rfi> for RfiSuggestion {
    fn from(rfi: &Rfi) -> Self {
        Self {
            id: rfi.id.clone(),
            number: rfi.number.clone(),
            location: rfi.location.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub count: usize,
    pub match_type: Option<MatchType>,
    pub rfis: Vec<RfiSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
