use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    /// Number of TagLink rows pointing at this tag.
    pub questions: i64,
    pub created_at: DateTime<Utc>,
}

/// Join row attaching a tag to a question. Unique per (tag, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TagLink {
    pub id: Uuid,
    pub tag_id: Uuid,
    pub question_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TagLink {
    pub fn new(tag_id: Uuid, question_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag_id,
            question_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&Tag> for TagSummary {
    fn from(tag: &Tag) -> Self {
        Self { id: tag.id, name: tag.name.clone() }
    }
}

/// Case-insensitive key used for tag identity.
pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}
