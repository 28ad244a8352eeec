use axum::extract::{Json, Query, State};
use tracing::debug;

use crate::{
    api::types::{RfiSuggestion, SuggestQuery, SuggestResponse},
    app::AppState,
    auth::session::AuthenticatedUser,
    chainage::{
        parse::split_list, parse_point, parse_range, range_from_bounds, select_matching,
        ChainageScope, MatchType,
    },
    model::rfi::Rfi,
};

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Specific chainages from a list; malformed items are skipped and reported.
fn specific_scope(raw: &str) -> (ChainageScope, Option<String>) {
    let mut specific = Vec::new();
    let mut rejected = Vec::new();
    for item in split_list(raw) {
        match parse_point(item) {
            Ok(point) => specific.push(point),
            Err(_) => rejected.push(item.to_string()),
        }
    }
    let error = (!rejected.is_empty())
        .then(|| format!("ignored invalid chainage(s): {}", rejected.join(", ")));
    (ChainageScope { specific, range: None }, error)
}

/// Turn query parameters into a scope. Never fails; problems are returned as text.
pub fn scope_from_query(query: &SuggestQuery) -> (ChainageScope, Option<String>) {
    if let Some(list) = non_empty(&query.specific_chainages) {
        return specific_scope(list);
    }

    match (non_empty(&query.chainage_from), non_empty(&query.chainage_to)) {
        (Some(from), Some(to)) => match range_from_bounds(from, to) {
            Ok(range) => (
                ChainageScope {
                    specific: Vec::new(),
                    range: Some(range),
                },
                None,
            ),
            Err(e) => (ChainageScope::default(), Some(e.to_string())),
        },
        (Some(from), None) => match parse_range(from) {
            Ok(range) => (
                ChainageScope {
                    specific: Vec::new(),
                    range: Some(range),
                },
                None,
            ),
            Err(_) => specific_scope(from),
        },
        (None, Some(_)) => (
            ChainageScope::default(),
            Some("chainage_from is required with chainage_to".into()),
        ),
        (None, None) => (
            ChainageScope::default(),
            Some("provide chainage_from or specific_chainages".into()),
        ),
    }
}

pub fn suggest_from_scope(
    scope: &ChainageScope,
    match_type: Option<MatchType>,
    rfis: &[Rfi],
    error: Option<String>,
) -> SuggestResponse {
    let matched: Vec<RfiSuggestion> = select_matching(scope, rfis)
        .into_iter()
        .map(RfiSuggestion::from)
        .collect();

    SuggestResponse {
        count: matched.len(),
        match_type,
        rfis: matched,
        error,
    }
}

/// Best-effort suggestion of RFIs at the given chainages; always 200.
pub async fn suggest_rfis(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Query(query): Query<SuggestQuery>,
) -> Json<SuggestResponse> {
    let (scope, mut error) = scope_from_query(&query);

    let rfis = match state.db.list_rfis().await {
        Ok(rfis) => rfis,
        Err(e) => {
            error = Some(e.to_string());
            Vec::new()
        }
    };

    let response = suggest_from_scope(&scope, scope.match_type(), &rfis, error);
    debug!(
        count = response.count,
        match_type = ?response.match_type,
        "rfi suggestions computed"
    );
    Json(response)
}
