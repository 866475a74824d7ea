// handlers/mod.rs - thin axum adapters over `actions`
//
// Public (no session needed) → Protected (session resolved by middleware,
// enforced by the identity gate inside each action)
pub mod protected;
pub mod public;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::{Map, Value};

use crate::actions::Actions;
use crate::database::Store;
use crate::error::ActionError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub actions: Actions,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            actions: Actions::new(store.clone()),
            store,
        }
    }
}

// Query keys that carry numbers; everything else stays a string.
const NUMERIC_PARAMS: &[&str] = &["page", "pageSize"];

/// Turn a JSON body extraction into the raw input an action expects.
/// A missing or unparseable body becomes a validation error, not a plain-text
/// axum rejection.
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ActionError> {
    match payload {
        Ok(Json(Value::Object(map))) => Ok(Value::Object(map)),
        Ok(Json(Value::Null)) => Ok(Value::Object(Map::new())),
        Ok(Json(_)) => Err(ActionError::invalid_field("body", "Request body must be a JSON object")),
        Err(rejection) => Err(ActionError::invalid_field("body", rejection.body_text())),
    }
}

/// Query-string parameters as raw action input.
pub(crate) fn query_input(params: HashMap<String, String>) -> Value {
    let map = params
        .into_iter()
        .map(|(key, value)| {
            let value = match value.parse::<i64>() {
                Ok(n) if NUMERIC_PARAMS.contains(&key.as_str()) => Value::from(n),
                _ => Value::String(value),
            };
            (key, value)
        })
        .collect::<Map<String, Value>>();
    Value::Object(map)
}

/// Merge a path parameter into the raw input under `key`.
pub(crate) fn with_param(mut input: Value, key: &str, value: String) -> Value {
    if let Value::Object(map) = &mut input {
        map.insert(key.to_string(), Value::String(value));
    }
    input
}
