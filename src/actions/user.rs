use axum::http::StatusCode;
use serde_json::Value;

use super::{respond, Actions};
use crate::api::response::ActionResponse;
use crate::auth::{require_session, Session};
use crate::database::models::User;
use crate::validation::{validate, UserProfileInput};

impl Actions {
    pub async fn ensure_user(&self, session: Option<&Session>, raw: Value) -> ActionResponse<User> {
        let result = async {
            let profile = validate::<UserProfileInput>(raw)?;
            let actor = require_session(session)?;
            self.engine.ensure_user(actor, profile).await
        }
        .await;
        respond("ensure_user", StatusCode::OK, result)
    }
}
