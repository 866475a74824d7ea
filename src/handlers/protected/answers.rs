use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::session;
use crate::api::response::ActionResponse;
use crate::auth::Session;
use crate::database::models::Answer;
use crate::engine::Deleted;
use crate::handlers::{json_body, with_param, AppState};

/// POST /api/questions/:id/answers
pub async fn answer_post(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(question_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ActionResponse<Answer> {
    match json_body(payload) {
        Ok(input) => {
            let input = with_param(input, "questionId", question_id);
            state.actions.create_answer(session(&ext), input).await
        }
        Err(e) => ActionResponse::failure(e),
    }
}

/// DELETE /api/answers/:id
pub async fn answer_delete(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(id): Path<String>,
) -> ActionResponse<Deleted> {
    state.actions.delete_answer(session(&ext), json!({ "answerId": id })).await
}
