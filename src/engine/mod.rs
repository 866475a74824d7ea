//! Mutation engine.
//!
//! Every operation opens one store transaction, performs its ordered writes
//! through `StoreTx`, and commits only if all of them succeeded. Any error
//! aborts the transaction; if the calling future is dropped before `finish`
//! runs, dropping the transaction rolls it back.

pub mod answer;
pub mod collection;
pub mod question;
pub mod tags;
pub mod user;
pub mod vote;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::database::models::{Answer, Question, User};
use crate::database::{Store, StoreTx};
use crate::error::ActionError;
use crate::validation::{AnswerRef, AskQuestion, CreateAnswer, CreateVote, EditQuestion, QuestionRef, UserProfile};

pub use collection::SavedStatus;
pub use vote::{VoteState, VoteStatus};

/// Acknowledgement returned by delete operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub id: Uuid,
}

#[derive(Clone)]
pub struct MutationEngine {
    store: Arc<dyn Store>,
}

impl MutationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn begin(&self, op: &str) -> Result<Box<dyn StoreTx>, ActionError> {
        self.store.begin().await.map_err(|e| {
            warn!("{}: could not open transaction: {}", op, e);
            ActionError::from(e)
        })
    }

    /// Commit on success, abort on failure. Never retries.
    async fn finish<T>(tx: Box<dyn StoreTx>, op: &str, result: Result<T, ActionError>) -> Result<T, ActionError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!("{} aborted: {}", op, err);
                if let Err(abort_err) = tx.abort().await {
                    error!("{}: rollback failed: {}", op, abort_err);
                }
                Err(err)
            }
        }
    }

    pub async fn create_question(&self, actor: &Session, cmd: AskQuestion) -> Result<Question, ActionError> {
        let mut tx = self.begin("create_question").await?;
        let result = async {
            user::register_author(tx.as_mut(), actor).await?;
            question::create(tx.as_mut(), actor.user_id, cmd).await
        }
        .await;
        let question = Self::finish(tx, "create_question", result).await?;
        info!("Question {} created by {} with {} tags", question.id, actor.user_id, question.tags.len());
        Ok(question)
    }

    pub async fn edit_question(&self, actor: &Session, cmd: EditQuestion) -> Result<Question, ActionError> {
        let mut tx = self.begin("edit_question").await?;
        let result = question::edit(tx.as_mut(), actor.user_id, cmd).await;
        let question = Self::finish(tx, "edit_question", result).await?;
        info!("Question {} edited by {}", question.id, actor.user_id);
        Ok(question)
    }

    pub async fn delete_question(&self, actor: &Session, cmd: QuestionRef) -> Result<Deleted, ActionError> {
        let mut tx = self.begin("delete_question").await?;
        let result = question::delete(tx.as_mut(), actor.user_id, cmd.question_id).await;
        Self::finish(tx, "delete_question", result).await?;
        info!("Question {} deleted by {}", cmd.question_id, actor.user_id);
        Ok(Deleted { id: cmd.question_id })
    }

    pub async fn create_answer(&self, actor: &Session, cmd: CreateAnswer) -> Result<Answer, ActionError> {
        let mut tx = self.begin("create_answer").await?;
        let result = async {
            user::register_author(tx.as_mut(), actor).await?;
            answer::create(tx.as_mut(), actor.user_id, cmd).await
        }
        .await;
        let answer = Self::finish(tx, "create_answer", result).await?;
        info!("Answer {} posted on question {} by {}", answer.id, answer.question_id, actor.user_id);
        Ok(answer)
    }

    pub async fn delete_answer(&self, actor: &Session, cmd: AnswerRef) -> Result<Deleted, ActionError> {
        let mut tx = self.begin("delete_answer").await?;
        let result = answer::delete(tx.as_mut(), actor.user_id, cmd.answer_id).await;
        let question_id = Self::finish(tx, "delete_answer", result).await?;
        info!("Answer {} on question {} deleted by {}", cmd.answer_id, question_id, actor.user_id);
        Ok(Deleted { id: cmd.answer_id })
    }

    pub async fn create_or_toggle_vote(&self, actor: &Session, cmd: CreateVote) -> Result<VoteStatus, ActionError> {
        let mut tx = self.begin("vote").await?;
        let result = async {
            user::register_author(tx.as_mut(), actor).await?;
            vote::create_or_toggle(tx.as_mut(), actor.user_id, cmd).await
        }
        .await;
        let status = Self::finish(tx, "vote", result).await?;
        info!(
            "User {} {} on {} {}: {:?}",
            actor.user_id, cmd.vote_type, cmd.target_type, cmd.target_id, status
        );
        Ok(status)
    }

    pub async fn toggle_saved_question(&self, actor: &Session, cmd: QuestionRef) -> Result<SavedStatus, ActionError> {
        let mut tx = self.begin("toggle_saved_question").await?;
        let result = async {
            user::register_author(tx.as_mut(), actor).await?;
            collection::toggle(tx.as_mut(), actor.user_id, cmd.question_id).await
        }
        .await;
        let status = Self::finish(tx, "toggle_saved_question", result).await?;
        info!("User {} saved={} question {}", actor.user_id, status.saved, cmd.question_id);
        Ok(status)
    }

    pub async fn ensure_user(&self, actor: &Session, profile: UserProfile) -> Result<User, ActionError> {
        let mut tx = self.begin("ensure_user").await?;
        let result = user::ensure(tx.as_mut(), actor, profile).await;
        let user = Self::finish(tx, "ensure_user", result).await?;
        info!("User {} profile synced", user.id);
        Ok(user)
    }
}
