use std::collections::HashMap;

use uuid::Uuid;

use super::tags::{self, TagStep};
use crate::database::models::{tag_key, Question, Tag, TagLink, TargetType};
use crate::database::{Counter, StoreTx};
use crate::error::ActionError;
use crate::validation::{AskQuestion, EditQuestion};

/// Moves tag usage counters for one question and reconciles its links.
/// Returns the ids of the attached tags in `attach` order.
async fn retag(
    tx: &mut dyn StoreTx,
    question_id: Uuid,
    attach: &[String],
    detach: &[Tag],
) -> Result<Vec<Uuid>, ActionError> {
    let mut attached: HashMap<String, Uuid> = HashMap::with_capacity(attach.len());
    for step in tags::lock_order(attach, detach) {
        match step {
            TagStep::Attach(name) => {
                let tag = tx.upsert_tag_increment(&name).await?;
                attached.insert(tag_key(&name), tag.id);
            }
            TagStep::Detach(tag_id) => {
                tx.increment(Counter::TagQuestions, tag_id, -1).await?;
            }
        }
    }

    if !detach.is_empty() {
        let ids: Vec<Uuid> = detach.iter().map(|t| t.id).collect();
        let removed = tx.delete_tag_links(question_id, &ids).await?;
        if removed != ids.len() as u64 {
            tracing::warn!("Question {} had {} of {} expected tag links", question_id, removed, ids.len());
        }
    }

    let mut tag_ids = Vec::with_capacity(attach.len());
    for name in attach {
        let tag_id = attached
            .get(&tag_key(name))
            .copied()
            .ok_or_else(|| ActionError::internal(format!("tag {} was never upserted", name)))?;
        tx.insert_tag_link(&TagLink::new(tag_id, question_id)).await?;
        tag_ids.push(tag_id);
    }
    Ok(tag_ids)
}

async fn owned_question(tx: &mut dyn StoreTx, actor: Uuid, question_id: Uuid, verb: &str) -> Result<Question, ActionError> {
    let question = tx
        .find_question(question_id)
        .await?
        .ok_or_else(|| ActionError::not_found("Question not found"))?;
    if question.author_id != actor {
        return Err(ActionError::forbidden(format!("You are not allowed to {} this question", verb)));
    }
    Ok(question)
}

pub(crate) async fn create(tx: &mut dyn StoreTx, actor: Uuid, cmd: AskQuestion) -> Result<Question, ActionError> {
    let names = tags::normalize(&cmd.tags);
    let mut question = Question::new(cmd.title, cmd.content, actor);
    tx.insert_question(&question).await?;

    let tag_ids = retag(tx, question.id, &names, &[]).await?;
    tx.set_question_tags(question.id, &tag_ids).await?;
    question.tags = tag_ids;
    Ok(question)
}

pub(crate) async fn edit(tx: &mut dyn StoreTx, actor: Uuid, cmd: EditQuestion) -> Result<Question, ActionError> {
    let mut question = owned_question(tx, actor, cmd.question_id, "edit").await?;

    if question.title != cmd.title || question.content != cmd.content {
        tx.update_question_text(question.id, &cmd.title, &cmd.content).await?;
        question.title = cmd.title;
        question.content = cmd.content;
    }

    let current = tx.find_tags(&question.tags).await?;
    let delta = tags::diff(&current, &cmd.tags);
    if delta.is_empty() {
        return Ok(question);
    }

    let dropped: Vec<Tag> = current.into_iter().filter(|t| delta.to_remove.contains(&t.id)).collect();
    let added = retag(tx, question.id, &delta.to_add, &dropped).await?;

    question.tags.retain(|id| !delta.to_remove.contains(id));
    question.tags.extend(added);
    tx.set_question_tags(question.id, &question.tags).await?;
    Ok(question)
}

pub(crate) async fn delete(tx: &mut dyn StoreTx, actor: Uuid, question_id: Uuid) -> Result<(), ActionError> {
    let question = owned_question(tx, actor, question_id, "delete").await?;

    let current = tx.find_tags(&question.tags).await?;
    retag(tx, question.id, &[], &current).await?;
    for answer_id in tx.answer_ids_for_question(question.id).await? {
        tx.delete_votes_for_target(answer_id, TargetType::Answer).await?;
    }
    tx.delete_votes_for_target(question.id, TargetType::Question).await?;
    let answers = tx.delete_answers_for_question(question.id).await?;
    let saves = tx.delete_collections_for_question(question.id).await?;
    tx.delete_question(question.id).await?;

    tracing::debug!("Deleted question {} with {} answers and {} saves", question.id, answers, saves);
    Ok(())
}
