//! Validation gate.
//!
//! Raw JSON is first deserialized into a loosely-typed input struct (every
//! field optional) and then checked field by field into a typed command.
//! Nothing downstream of this module ever sees unchecked input.

pub mod schemas;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ActionError, FieldErrors};

pub use schemas::{
    AnswerRef, AnswerRefInput, AskQuestion, AskQuestionInput, CreateAnswer, CreateAnswerInput,
    CreateVote, CreateVoteInput, EditQuestion, EditQuestionInput, GetAnswers, GetAnswersInput,
    PaginatedSearchInput, QuestionRef, QuestionRefInput, SavedQuestionsQuery, UserProfile,
    UserProfileInput, VoteTarget, VoteTargetInput,
};

/// A raw input shape that knows how to check itself into a typed command.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ActionError>;
}

/// Deserialize `raw` as `S` and validate it.
pub fn validate<S>(raw: Value) -> Result<S::Output, ActionError>
where
    S: Validate + DeserializeOwned,
{
    let input: S = serde_json::from_value(raw).map_err(|e| {
        tracing::debug!("Rejected malformed input: {}", e);
        ActionError::invalid_field("body", format!("Malformed input: {}", e))
    })?;
    input.validate()
}

/// Collects per-field messages, then fails once with all of them.
#[derive(Debug, Default)]
pub struct Checker {
    errors: FieldErrors,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    /// Required string with a character-count range. Returns the trimmed value.
    pub fn text(&mut self, field: &str, label: &str, value: Option<String>, min: usize, max: Option<usize>) -> String {
        let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
        let len = value.chars().count();
        if len == 0 {
            self.fail(field, format!("{} is required", label));
        } else if len < min {
            self.fail(field, format!("{} must be at least {} characters", label, min));
        } else if let Some(max) = max {
            if len > max {
                self.fail(field, format!("{} cannot exceed {} characters", label, max));
            }
        }
        value
    }

    /// Required UUID. Returns nil on failure; the caller never sees it because
    /// `finish` will fail.
    pub fn uuid(&mut self, field: &str, value: Option<String>) -> uuid::Uuid {
        match value.as_deref().map(str::trim) {
            None | Some("") => {
                self.fail(field, "ID is required");
                uuid::Uuid::nil()
            }
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                self.fail(field, "Invalid ID");
                uuid::Uuid::nil()
            }),
        }
    }

    /// Optional positive integer (page numbers and sizes).
    pub fn positive(&mut self, field: &str, value: Option<i64>) -> Option<u32> {
        let value = value?;
        if value < 1 {
            self.fail(field, format!("{} must be a positive number", field));
            return None;
        }
        Some(u32::try_from(value).unwrap_or(u32::MAX))
    }

    /// Required member of a closed set, parsed with `FromStr`.
    pub fn one_of<T: std::str::FromStr>(&mut self, field: &str, value: Option<String>, allowed: &[&str]) -> Option<T> {
        let Some(raw) = value else {
            self.fail(field, format!("{} is required", field));
            return None;
        };
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.fail(field, format!("{} must be one of: {}", field, allowed.join(", ")));
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ActionError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self
            .errors
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "Invalid input".to_string());
        Err(ActionError::validation(message, self.errors))
    }
}
