use axum::http::StatusCode;
use serde_json::Value;

use super::{respond, Actions};
use crate::api::response::{ActionResponse, Page};
use crate::auth::{require_session, Session};
use crate::database::models::SavedQuestionView;
use crate::engine::SavedStatus;
use crate::validation::{validate, PaginatedSearchInput, QuestionRefInput};

impl Actions {
    pub async fn toggle_save_question(&self, session: Option<&Session>, raw: Value) -> ActionResponse<SavedStatus> {
        let result = async {
            let cmd = validate::<QuestionRefInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.toggle_saved_question(actor, cmd).await
        }
        .await;
        respond("toggle_save_question", StatusCode::OK, result)
    }

    pub async fn has_saved_question(&self, session: Option<&Session>, raw: Value) -> ActionResponse<SavedStatus> {
        let result = async {
            let cmd = validate::<QuestionRefInput>(raw)?;
            let actor = require_session(session)?;
            self.reads.has_saved_question(actor.user_id, cmd.question_id).await
        }
        .await;
        respond("has_saved_question", StatusCode::OK, result)
    }

    /// Always scoped to the caller's own collection.
    pub async fn get_saved_questions(
        &self,
        session: Option<&Session>,
        raw: Value,
    ) -> ActionResponse<Page<SavedQuestionView>> {
        let result = async {
            let query = validate::<PaginatedSearchInput>(raw)?;
            let actor = require_session(session)?;
            self.reads.get_saved_questions(actor.user_id, query).await
        }
        .await;
        respond("get_saved_questions", StatusCode::OK, result)
    }
}
