use axum::http::StatusCode;
use serde_json::Value;

use super::{respond, Actions};
use crate::api::response::ActionResponse;
use crate::auth::{require_session, Session};
use crate::engine::VoteStatus;
use crate::validation::{validate, CreateVoteInput, VoteTargetInput};

impl Actions {
    pub async fn create_vote(&self, session: Option<&Session>, raw: Value) -> ActionResponse<VoteStatus> {
        let result = async {
            let cmd = validate::<CreateVoteInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.create_or_toggle_vote(actor, cmd).await
        }
        .await;
        respond("create_vote", StatusCode::OK, result)
    }

    pub async fn has_voted(&self, session: Option<&Session>, raw: Value) -> ActionResponse<VoteStatus> {
        let result = async {
            let target = validate::<VoteTargetInput>(raw)?;
            let actor = require_session(session)?;
            self.reads.has_voted(actor.user_id, target.target_id, target.target_type).await
        }
        .await;
        respond("has_voted", StatusCode::OK, result)
    }
}
