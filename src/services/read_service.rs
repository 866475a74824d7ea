use std::sync::Arc;

use uuid::Uuid;

use crate::api::response::Page;
use crate::database::models::{AnswerView, QuestionView, SavedQuestionView, TargetType};
use crate::database::Store;
use crate::engine::{SavedStatus, VoteState, VoteStatus};
use crate::error::ActionError;
use crate::validation::{GetAnswers, SavedQuestionsQuery};

/// Read/query layer. Never opens a transaction; the only authorization it
/// applies is scoping per-user reads to the caller's id.
#[derive(Clone)]
pub struct ReadService {
    store: Arc<dyn Store>,
}

impl ReadService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_question(&self, question_id: Uuid) -> Result<QuestionView, ActionError> {
        self.store
            .question_view(question_id)
            .await?
            .ok_or_else(|| ActionError::not_found("Question not found"))
    }

    pub async fn get_answers(&self, query: GetAnswers) -> Result<Page<AnswerView>, ActionError> {
        let slice = self
            .store
            .answers_page(query.question_id, query.sort, query.pagination)
            .await?;
        let is_next = query.pagination.is_next(slice.total, slice.items.len());
        tracing::debug!(
            "Fetched {} of {} answers for question {} ({:?})",
            slice.items.len(),
            slice.total,
            query.question_id,
            query.sort
        );
        Ok(Page::new(slice.items, is_next, Some(slice.total)))
    }

    pub async fn get_saved_questions(
        &self,
        user_id: Uuid,
        query: SavedQuestionsQuery,
    ) -> Result<Page<SavedQuestionView>, ActionError> {
        let slice = self
            .store
            .saved_questions_page(user_id, query.search.as_ref(), query.sort, query.pagination)
            .await?;
        let is_next = query.pagination.is_next(slice.total, slice.items.len());
        Ok(Page::new(slice.items, is_next, Some(slice.total)))
    }

    pub async fn has_voted(&self, user_id: Uuid, target_id: Uuid, target_type: TargetType) -> Result<VoteStatus, ActionError> {
        let vote = self.store.find_vote(user_id, target_id, target_type).await?;
        Ok(VoteState::of(vote.map(|v| v.vote_type)).status())
    }

    pub async fn has_saved_question(&self, user_id: Uuid, question_id: Uuid) -> Result<SavedStatus, ActionError> {
        let saved = self.store.find_collection(user_id, question_id).await?.is_some();
        Ok(SavedStatus { saved })
    }
}
