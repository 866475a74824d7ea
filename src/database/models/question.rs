use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::tag::TagSummary;
use super::user::AuthorSummary;

/// Question row. Counters are only ever changed through atomic increments
/// issued by the mutation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    /// Attached tag ids, in attachment order.
    pub tags: Vec<Uuid>,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Fresh question with zeroed counters and no tags attached yet.
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            author_id,
            tags: Vec::new(),
            answers: 0,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Question with tags and author resolved, as returned by the read layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Option<AuthorSummary>,
    pub tags: Vec<TagSummary>,
    pub answers: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl QuestionView {
    pub fn assemble(question: Question, author: Option<AuthorSummary>, tags: Vec<TagSummary>) -> Self {
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            author,
            tags,
            answers: question.answers,
            upvotes: question.upvotes,
            downvotes: question.downvotes,
            views: question.views,
            created_at: question.created_at,
        }
    }
}

/// One entry of a user's saved-question listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuestionView {
    pub collection_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub question: QuestionView,
}
