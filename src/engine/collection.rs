use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::Collection;
use crate::database::StoreTx;
use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedStatus {
    pub saved: bool,
}

/// Check-then-act inside one transaction: present → remove, absent → add.
pub(crate) async fn toggle(tx: &mut dyn StoreTx, actor: Uuid, question_id: Uuid) -> Result<SavedStatus, ActionError> {
    tx.find_question(question_id)
        .await?
        .ok_or_else(|| ActionError::not_found("Question not found"))?;

    match tx.find_collection(actor, question_id).await? {
        Some(existing) => {
            tx.delete_collection(existing.id).await?;
            Ok(SavedStatus { saved: false })
        }
        None => {
            tx.insert_collection(&Collection::new(actor, question_id)).await?;
            Ok(SavedStatus { saved: true })
        }
    }
}
