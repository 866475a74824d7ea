use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::session;
use crate::api::response::ActionResponse;
use crate::auth::Session;
use crate::engine::VoteStatus;
use crate::handlers::{json_body, AppState};

/// POST /api/votes - cast, retract or switch a vote
pub async fn vote_post(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ActionResponse<VoteStatus> {
    match json_body(payload) {
        Ok(input) => state.actions.create_vote(session(&ext), input).await,
        Err(e) => ActionResponse::failure(e),
    }
}

/// GET /api/votes/:target_type/:target_id - the caller's current vote
pub async fn vote_get(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path((target_type, target_id)): Path<(String, String)>,
) -> ActionResponse<VoteStatus> {
    let input = json!({ "targetId": target_id, "targetType": target_type });
    state.actions.has_voted(session(&ext), input).await
}
