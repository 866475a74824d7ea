use uuid::Uuid;

use crate::database::models::{Answer, TargetType};
use crate::database::{Counter, StoreTx};
use crate::error::ActionError;
use crate::validation::CreateAnswer;

pub(crate) async fn create(tx: &mut dyn StoreTx, actor: Uuid, cmd: CreateAnswer) -> Result<Answer, ActionError> {
    // holds the parent row so a concurrent delete cannot slip in between
    tx.find_question(cmd.question_id)
        .await?
        .ok_or_else(|| ActionError::not_found("Question not found"))?;

    let answer = Answer::new(cmd.question_id, actor, cmd.content);
    tx.insert_answer(&answer).await?;
    tx.increment(Counter::QuestionAnswers, answer.question_id, 1).await?;
    Ok(answer)
}

pub(crate) async fn delete(tx: &mut dyn StoreTx, actor: Uuid, answer_id: Uuid) -> Result<Uuid, ActionError> {
    // parent question first, then the answer: the order question deletion locks them in
    let parent = tx
        .answer_parent(answer_id)
        .await?
        .ok_or_else(|| ActionError::not_found("Answer not found"))?;
    tx.find_question(parent).await?;
    let answer = tx
        .find_answer(answer_id)
        .await?
        .ok_or_else(|| ActionError::not_found("Answer not found"))?;
    if answer.author_id != actor {
        return Err(ActionError::forbidden("You are not allowed to delete this answer"));
    }

    if !tx.increment(Counter::QuestionAnswers, answer.question_id, -1).await? {
        tracing::warn!("Answer {} points at missing question {}", answer.id, answer.question_id);
    }
    tx.delete_votes_for_target(answer.id, TargetType::Answer).await?;
    tx.delete_answer(answer.id).await?;
    Ok(answer.question_id)
}
