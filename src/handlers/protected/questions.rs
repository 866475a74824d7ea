use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::session;
use crate::api::response::ActionResponse;
use crate::auth::Session;
use crate::database::models::Question;
use crate::engine::Deleted;
use crate::handlers::{json_body, with_param, AppState};

/// POST /api/questions - ask a question
pub async fn question_post(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ActionResponse<Question> {
    match json_body(payload) {
        Ok(input) => state.actions.create_question(session(&ext), input).await,
        Err(e) => ActionResponse::failure(e),
    }
}

/// PUT /api/questions/:id - edit title, content and tags (author only)
pub async fn question_put(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ActionResponse<Question> {
    match json_body(payload) {
        Ok(input) => {
            let input = with_param(input, "questionId", id);
            state.actions.edit_question(session(&ext), input).await
        }
        Err(e) => ActionResponse::failure(e),
    }
}

/// DELETE /api/questions/:id - remove a question and everything hanging off it
pub async fn question_delete(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(id): Path<String>,
) -> ActionResponse<Deleted> {
    state.actions.delete_question(session(&ext), json!({ "questionId": id })).await
}
