use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Saved-question marker. The row existing is the "saved" state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub author_id: Uuid,
    pub question_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(author_id: Uuid, question_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            question_id,
            created_at: Utc::now(),
        }
    }
}
