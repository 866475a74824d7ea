use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use serde_json::json;

use crate::api::response::{ActionResponse, Page};
use crate::database::models::{AnswerView, QuestionView};
use crate::handlers::{query_input, with_param, AppState};

/// GET /api/questions/:id
pub async fn question_get(State(state): State<AppState>, Path(id): Path<String>) -> ActionResponse<QuestionView> {
    state.actions.get_question(json!({ "questionId": id })).await
}

/// GET /api/questions/:id/answers?page=&pageSize=&filter=
pub async fn answers_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ActionResponse<Page<AnswerView>> {
    let input = with_param(query_input(params), "questionId", id);
    state.actions.get_answers(input).await
}
