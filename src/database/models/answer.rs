use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::AuthorSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(question_id: Uuid, author_id: Uuid, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question_id,
            author_id,
            content: content.into(),
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Answer with its author summary resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: Uuid,
    pub question_id: Uuid,
    pub author: Option<AuthorSummary>,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl AnswerView {
    pub fn assemble(answer: Answer, author: Option<AuthorSummary>) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            author,
            content: answer.content,
            upvotes: answer.upvotes,
            downvotes: answer.downvotes,
            created_at: answer.created_at,
        }
    }
}
