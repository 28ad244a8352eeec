use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    api::{
        suggest::suggest_from_scope,
        types::{CreateObjectionRequest, SuggestResponse},
    },
    app::AppState,
    auth::session::AuthenticatedUser,
    chainage::{parse_list, range_from_bounds, select_matching, ChainageError},
    model::objection::Objection,
};

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn unprocessable(field: &str, err: ChainageError) -> (StatusCode, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, format!("{field}: {err}"))
}

async fn load_objection(state: &AppState, id: &str) -> Result<Objection, (StatusCode, String)> {
    state
        .db
        .load_objection(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, format!("objection {id} not found")))
}

/// Validates every chainage field; malformed input is a 422.
pub async fn create_objection(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(req): Json<CreateObjectionRequest>,
) -> Result<Json<Objection>, (StatusCode, String)> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "title is required".into()));
    }

    let specific_chainages = trimmed(req.specific_chainages);
    if let Some(list) = specific_chainages.as_deref() {
        parse_list(list).map_err(|e| unprocessable("specific_chainages", e))?;
    }

    let chainage_from = trimmed(req.chainage_from);
    let chainage_to = trimmed(req.chainage_to);
    if chainage_from.is_some() || chainage_to.is_some() {
        range_from_bounds(
            chainage_from.as_deref().unwrap_or_default(),
            chainage_to.as_deref().unwrap_or_default(),
        )
        .map_err(|e| unprocessable("chainage range", e))?;
    }

    for rfi_id in &req.rfi_ids {
        let exists = state
            .db
            .load_rfi(rfi_id)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .is_some();
        if !exists {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("rfi_ids: unknown RFI {rfi_id}"),
            ));
        }
    }

    let mut rfi_ids = req.rfi_ids;
    rfi_ids.sort();
    rfi_ids.dedup();

    let objection = Objection {
        id: Uuid::new_v4().to_string(),
        title,
        description: req.description,
        status: req.status.unwrap_or_default(),
        specific_chainages,
        chainage_from,
        chainage_to,
        rfi_ids,
        created_by: auth.user.id.clone(),
        created_ts: chrono::Utc::now().timestamp(),
    };

    state
        .db
        .save_objection(&objection)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(objection_id = %objection.id, user_id = %auth.user.id, "objection created");
    Ok(Json(objection))
}

pub async fn get_objection(
    Path(objection_id): Path<String>,
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Objection>, (StatusCode, String)> {
    load_objection(&state, &objection_id).await.map(Json)
}

/// RFIs whose location matches the objection's chainages or range.
pub async fn matching_rfis(
    Path(objection_id): Path<String>,
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<SuggestResponse>, (StatusCode, String)> {
    let objection = load_objection(&state, &objection_id).await?;
    let rfis = state
        .db
        .list_rfis()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let scope = objection.scope();
    Ok(Json(suggest_from_scope(
        &scope,
        scope.match_type(),
        &rfis,
        None,
    )))
}

/// Attach every matching RFI to the objection.
pub async fn attach_matching(
    Path(objection_id): Path<String>,
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Objection>, (StatusCode, String)> {
    let mut objection = load_objection(&state, &objection_id).await?;
    let rfis = state
        .db
        .list_rfis()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let scope = objection.scope();
    let before = objection.rfi_ids.len();
    objection
        .rfi_ids
        .extend(select_matching(&scope, &rfis).into_iter().map(|r| r.id.clone()));
    objection.rfi_ids.sort();
    objection.rfi_ids.dedup();

    state
        .db
        .save_objection(&objection)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(
        objection_id = %objection.id,
        user_id = %auth.user.id,
        attached = objection.rfi_ids.len().saturating_sub(before),
        "matching rfis attached"
    );
    Ok(Json(objection))
}
