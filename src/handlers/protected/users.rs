use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::Value;

use super::session;
use crate::api::response::ActionResponse;
use crate::auth::Session;
use crate::database::models::User;
use crate::handlers::{json_body, AppState};

/// PUT /api/users/me - create or refresh the caller's user record
pub async fn me_put(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ActionResponse<User> {
    match json_body(payload) {
        Ok(input) => state.actions.ensure_user(session(&ext), input).await,
        Err(e) => ActionResponse::failure(e),
    }
}
