use axum::http::StatusCode;
use serde_json::Value;

use super::{respond, Actions};
use crate::api::response::{ActionResponse, Page};
use crate::auth::{require_session, Session};
use crate::database::models::{Answer, AnswerView};
use crate::engine::Deleted;
use crate::validation::{validate, AnswerRefInput, CreateAnswerInput, GetAnswersInput};

impl Actions {
    pub async fn create_answer(&self, session: Option<&Session>, raw: Value) -> ActionResponse<Answer> {
        let result = async {
            let cmd = validate::<CreateAnswerInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.create_answer(actor, cmd).await
        }
        .await;
        respond("create_answer", StatusCode::CREATED, result)
    }

    pub async fn delete_answer(&self, session: Option<&Session>, raw: Value) -> ActionResponse<Deleted> {
        let result = async {
            let cmd = validate::<AnswerRefInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.delete_answer(actor, cmd).await
        }
        .await;
        respond("delete_answer", StatusCode::OK, result)
    }

    pub async fn get_answers(&self, raw: Value) -> ActionResponse<Page<AnswerView>> {
        let result = async {
            let query = validate::<GetAnswersInput>(raw)?;
            self.reads.get_answers(query).await
        }
        .await;
        respond("get_answers", StatusCode::OK, result)
    }
}
