use axum::http::StatusCode;
use serde_json::Value;

use super::{respond, Actions};
use crate::api::response::ActionResponse;
use crate::auth::{require_session, Session};
use crate::database::models::{Question, QuestionView};
use crate::engine::Deleted;
use crate::validation::{validate, AskQuestionInput, EditQuestionInput, QuestionRefInput};

impl Actions {
    pub async fn create_question(&self, session: Option<&Session>, raw: Value) -> ActionResponse<Question> {
        let result = async {
            let cmd = validate::<AskQuestionInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.create_question(actor, cmd).await
        }
        .await;
        respond("create_question", StatusCode::CREATED, result)
    }

    pub async fn edit_question(&self, session: Option<&Session>, raw: Value) -> ActionResponse<Question> {
        let result = async {
            let cmd = validate::<EditQuestionInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.edit_question(actor, cmd).await
        }
        .await;
        respond("edit_question", StatusCode::OK, result)
    }

    pub async fn delete_question(&self, session: Option<&Session>, raw: Value) -> ActionResponse<Deleted> {
        let result = async {
            let cmd = validate::<QuestionRefInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.delete_question(actor, cmd).await
        }
        .await;
        respond("delete_question", StatusCode::OK, result)
    }

    /// Public read; no session needed.
    pub async fn get_question(&self, raw: Value) -> ActionResponse<QuestionView> {
        let result = async {
            let cmd = validate::<QuestionRefInput>(raw)?;
            self.reads.get_question(cmd.question_id).await
        }
        .await;
        respond("get_question", StatusCode::OK, result)
    }
}
