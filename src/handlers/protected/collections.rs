use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Extension;
use serde_json::json;

use super::session;
use crate::api::response::{ActionResponse, Page};
use crate::auth::Session;
use crate::database::models::SavedQuestionView;
use crate::engine::SavedStatus;
use crate::handlers::{query_input, AppState};

/// POST /api/collections/:question_id - save or unsave
pub async fn collection_post(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(question_id): Path<String>,
) -> ActionResponse<SavedStatus> {
    state
        .actions
        .toggle_save_question(session(&ext), json!({ "questionId": question_id }))
        .await
}

/// GET /api/collections/:question_id
pub async fn collection_get(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Path(question_id): Path<String>,
) -> ActionResponse<SavedStatus> {
    state
        .actions
        .has_saved_question(session(&ext), json!({ "questionId": question_id }))
        .await
}

/// GET /api/collections?page=&pageSize=&query=&filter=
pub async fn collection_list(
    State(state): State<AppState>,
    ext: Option<Extension<Session>>,
    Query(params): Query<HashMap<String, String>>,
) -> ActionResponse<Page<SavedQuestionView>> {
    state.actions.get_saved_questions(session(&ext), query_input(params)).await
}
