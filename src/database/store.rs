//! Storage seam between the mutation engine / read layer and a backend.
//!
//! `Store` hands out transactions and serves read-only queries. Every write
//! goes through a `StoreTx`, which must be finished with `commit` or `abort`;
//! dropping an unfinished transaction rolls it back.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::StoreError;
use super::models::{
    Answer, AnswerView, Collection, Question, QuestionView, SavedQuestionView, Tag, TagLink,
    TargetType, User, Vote, VoteType,
};
use crate::filter::{AnswerSort, Pagination, SavedQuestionSort, TextSearch};

/// Denormalized counter fields. Only ever changed through `StoreTx::increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    QuestionAnswers,
    QuestionUpvotes,
    QuestionDownvotes,
    QuestionViews,
    AnswerUpvotes,
    AnswerDownvotes,
    TagQuestions,
}

impl Counter {
    pub fn table(&self) -> &'static str {
        match self {
            Counter::QuestionAnswers
            | Counter::QuestionUpvotes
            | Counter::QuestionDownvotes
            | Counter::QuestionViews => "questions",
            Counter::AnswerUpvotes | Counter::AnswerDownvotes => "answers",
            Counter::TagQuestions => "tags",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Counter::QuestionAnswers => "answers",
            Counter::QuestionUpvotes | Counter::AnswerUpvotes => "upvotes",
            Counter::QuestionDownvotes | Counter::AnswerDownvotes => "downvotes",
            Counter::QuestionViews => "views",
            Counter::TagQuestions => "questions",
        }
    }

    /// The counter a vote of `vote_type` on a `target` contributes to.
    pub fn for_vote(target: TargetType, vote_type: VoteType) -> Self {
        match (target, vote_type) {
            (TargetType::Question, VoteType::Upvote) => Counter::QuestionUpvotes,
            (TargetType::Question, VoteType::Downvote) => Counter::QuestionDownvotes,
            (TargetType::Answer, VoteType::Upvote) => Counter::AnswerUpvotes,
            (TargetType::Answer, VoteType::Downvote) => Counter::AnswerDownvotes,
        }
    }
}

/// A page of rows plus the total row count matching the query.
#[derive(Debug, Clone)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction. Bounded by the backend's transaction timeout.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn question_view(&self, id: Uuid) -> Result<Option<QuestionView>, StoreError>;

    async fn answers_page(
        &self,
        question_id: Uuid,
        sort: AnswerSort,
        page: Pagination,
    ) -> Result<PageSlice<AnswerView>, StoreError>;

    /// Collection → Question → Author → Tags join, scoped to `user_id`.
    async fn saved_questions_page(
        &self,
        user_id: Uuid,
        search: Option<&TextSearch>,
        sort: SavedQuestionSort,
        page: Pagination,
    ) -> Result<PageSlice<SavedQuestionView>, StoreError>;

    async fn find_vote(
        &self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError>;

    async fn find_collection(
        &self,
        author_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<Collection>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn upsert_user(&mut self, user: &User) -> Result<User, StoreError>;
    /// Insert the user unless a row with that id exists. Returns whether it inserted.
    async fn insert_user_if_absent(&mut self, user: &User) -> Result<bool, StoreError>;

    /// Reads a question and holds it for the rest of the transaction.
    async fn find_question(&mut self, id: Uuid) -> Result<Option<Question>, StoreError>;
    async fn insert_question(&mut self, question: &Question) -> Result<(), StoreError>;
    async fn update_question_text(&mut self, id: Uuid, title: &str, content: &str) -> Result<(), StoreError>;
    async fn set_question_tags(&mut self, id: Uuid, tags: &[Uuid]) -> Result<(), StoreError>;
    async fn delete_question(&mut self, id: Uuid) -> Result<bool, StoreError>;

    /// Case-insensitive find-or-create that also bumps `questions` by one.
    async fn upsert_tag_increment(&mut self, name: &str) -> Result<Tag, StoreError>;
    async fn find_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Tag>, StoreError>;
    async fn insert_tag_link(&mut self, link: &TagLink) -> Result<(), StoreError>;
    async fn delete_tag_links(&mut self, question_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, StoreError>;

    async fn find_answer(&mut self, id: Uuid) -> Result<Option<Answer>, StoreError>;
    /// Parent question of an answer, read without holding the answer.
    async fn answer_parent(&mut self, id: Uuid) -> Result<Option<Uuid>, StoreError>;
    async fn insert_answer(&mut self, answer: &Answer) -> Result<(), StoreError>;
    async fn delete_answer(&mut self, id: Uuid) -> Result<bool, StoreError>;
    /// Ids of the question's answers, each held for the rest of the transaction.
    async fn answer_ids_for_question(&mut self, question_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    async fn delete_answers_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError>;

    async fn find_vote(
        &mut self,
        author_id: Uuid,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<Option<Vote>, StoreError>;
    async fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError>;
    async fn update_vote_type(&mut self, id: Uuid, vote_type: VoteType) -> Result<(), StoreError>;
    async fn delete_vote(&mut self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_votes_for_target(&mut self, target_id: Uuid, target_type: TargetType) -> Result<u64, StoreError>;

    async fn find_collection(&mut self, author_id: Uuid, question_id: Uuid) -> Result<Option<Collection>, StoreError>;
    async fn insert_collection(&mut self, collection: &Collection) -> Result<(), StoreError>;
    async fn delete_collection(&mut self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_collections_for_question(&mut self, question_id: Uuid) -> Result<u64, StoreError>;

    /// Atomic `field = field + delta`. Returns false when the row is missing.
    async fn increment(&mut self, counter: Counter, id: Uuid, delta: i64) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn abort(self: Box<Self>) -> Result<(), StoreError>;
}
