//! Per-(user, target) vote state machine.
//!
//! | state     | request  | step            | next      |
//! |-----------|----------|-----------------|-----------|
//! | NoVote    | up       | Cast(up)        | Upvoted   |
//! | NoVote    | down     | Cast(down)      | Downvoted |
//! | Upvoted   | up       | Retract(up)     | NoVote    |
//! | Upvoted   | down     | Switch(up→down) | Downvoted |
//! | Downvoted | down     | Retract(down)   | NoVote    |
//! | Downvoted | up       | Switch(down→up) | Upvoted   |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{TargetType, Vote, VoteType};
use crate::database::{Counter, StoreTx};
use crate::error::ActionError;
use crate::validation::CreateVote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Upvoted,
    Downvoted,
}

impl VoteState {
    pub fn of(vote_type: Option<VoteType>) -> Self {
        match vote_type {
            None => VoteState::NoVote,
            Some(VoteType::Upvote) => VoteState::Upvoted,
            Some(VoteType::Downvote) => VoteState::Downvoted,
        }
    }

    pub fn status(&self) -> VoteStatus {
        VoteStatus {
            has_upvoted: *self == VoteState::Upvoted,
            has_downvoted: *self == VoteState::Downvoted,
        }
    }
}

/// The write a vote request turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Cast(VoteType),
    Retract(VoteType),
    Switch { from: VoteType, to: VoteType },
}

impl Step {
    /// (vote type whose counter moves, delta)
    pub fn counter_deltas(&self) -> Vec<(VoteType, i64)> {
        match *self {
            Step::Cast(t) => vec![(t, 1)],
            Step::Retract(t) => vec![(t, -1)],
            Step::Switch { from, to } => vec![(from, -1), (to, 1)],
        }
    }
}

pub fn transition(state: VoteState, requested: VoteType) -> (Step, VoteState) {
    match (state, requested) {
        (VoteState::NoVote, t) => (Step::Cast(t), VoteState::of(Some(t))),
        (VoteState::Upvoted, VoteType::Upvote) => (Step::Retract(VoteType::Upvote), VoteState::NoVote),
        (VoteState::Downvoted, VoteType::Downvote) => (Step::Retract(VoteType::Downvote), VoteState::NoVote),
        (VoteState::Upvoted, VoteType::Downvote) => (
            Step::Switch { from: VoteType::Upvote, to: VoteType::Downvote },
            VoteState::Downvoted,
        ),
        (VoteState::Downvoted, VoteType::Upvote) => (
            Step::Switch { from: VoteType::Downvote, to: VoteType::Upvote },
            VoteState::Upvoted,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

async fn ensure_target(tx: &mut dyn StoreTx, target_id: Uuid, target_type: TargetType) -> Result<(), ActionError> {
    let exists = match target_type {
        TargetType::Question => tx.find_question(target_id).await?.is_some(),
        TargetType::Answer => tx.find_answer(target_id).await?.is_some(),
    };
    if exists {
        Ok(())
    } else {
        Err(ActionError::not_found(match target_type {
            TargetType::Question => "Question not found",
            TargetType::Answer => "Answer not found",
        }))
    }
}

pub(crate) async fn create_or_toggle(tx: &mut dyn StoreTx, actor: Uuid, cmd: CreateVote) -> Result<VoteStatus, ActionError> {
    // locks the target row for the rest of the transaction
    ensure_target(tx, cmd.target_id, cmd.target_type).await?;

    let existing = tx.find_vote(actor, cmd.target_id, cmd.target_type).await?;
    let state = VoteState::of(existing.as_ref().map(|v| v.vote_type));
    let (step, next) = transition(state, cmd.vote_type);
    tracing::debug!("Vote {:?} on {} {}: {:?} -> {:?}", step, cmd.target_type, cmd.target_id, state, next);

    match (step, existing) {
        (Step::Cast(vote_type), None) => {
            let vote = Vote::new(actor, cmd.target_id, cmd.target_type, vote_type);
            tx.insert_vote(&vote).await?;
        }
        (Step::Retract(_), Some(vote)) => {
            tx.delete_vote(vote.id).await?;
        }
        (Step::Switch { to, .. }, Some(vote)) => {
            tx.update_vote_type(vote.id, to).await?;
        }
        (step, _) => {
            return Err(ActionError::internal(format!("inconsistent vote step {:?}", step)));
        }
    }

    for (vote_type, delta) in step.counter_deltas() {
        let counter = Counter::for_vote(cmd.target_type, vote_type);
        if !tx.increment(counter, cmd.target_id, delta).await? {
            return Err(ActionError::not_found("Vote target no longer exists"));
        }
    }

    Ok(next.status())
}
