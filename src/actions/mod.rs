//! Server-side procedures.
//!
//! Each procedure runs the validation gate on raw JSON, then the identity
//! gate, then the engine or read layer, and always answers with an
//! `ActionResponse`; no error escapes as a panic or a bare `Err`.

mod answer;
mod collection;
mod question;
mod user;
mod vote;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::api::response::ActionResponse;
use crate::database::Store;
use crate::engine::MutationEngine;
use crate::error::ActionError;
use crate::services::ReadService;

#[derive(Clone)]
pub struct Actions {
    engine: MutationEngine,
    reads: ReadService,
}

impl Actions {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            engine: MutationEngine::new(store.clone()),
            reads: ReadService::new(store),
        }
    }
}

fn respond<T>(op: &str, status: StatusCode, result: Result<T, ActionError>) -> ActionResponse<T> {
    match result {
        Ok(data) => ActionResponse::with_status(data, status),
        Err(err) => {
            match &err {
                ActionError::Validation { .. } => tracing::debug!("{} rejected: {}", op, err),
                ActionError::Internal(_) => tracing::error!("{} failed: {}", op, err),
                _ => tracing::warn!("{} failed: {}", op, err),
            }
            ActionResponse::failure(err)
        }
    }
}
