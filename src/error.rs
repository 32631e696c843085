//! Planner error taxonomy
//!
//! Every variant carries full detail for the log; [`PlannerError::user_message`]
//! gives the short sentence shown to the user.

use thiserror::Error;

use crate::document::AdapterError;
use crate::domain::IdsExhausted;
use crate::llm::LlmError;
use crate::store::StoreError;

/// Errors surfaced by [`crate::session::PlannerSession`] operations
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Missing or unusable configuration, such as the API key
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-success response, malformed payload or transport failure
    #[error("Plan generator failed: {0}")]
    Llm(#[from] LlmError),

    /// The generator answered, but neither JSON nor the text scan found a section
    #[error("Could not parse any sections from the response: {0}")]
    Parse(String),

    /// Operation needs the document host and none is attached
    #[error("Feature unavailable: {0}")]
    FeatureUnavailable(String),

    /// The document host failed during an operation that cannot degrade
    #[error("Document error: {0}")]
    Document(#[from] AdapterError),

    /// Malformed import file or invalid user input
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Item {0} not found")]
    ItemNotFound(u32),

    /// A default outline item still present in the plan
    #[error("Item {0} is a default section still in the plan")]
    DeleteGuarded(u32),

    /// The same operation is already running
    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// Every item id has been handed out
    #[error("{0}")]
    Ids(#[from] IdsExhausted),
}

impl PlannerError {
    /// Short, non-technical message for the user
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Configuration(msg) => msg.clone(),
            PlannerError::Llm(e) => match e.upstream_message() {
                Some(upstream) => format!("The AI service returned an error: {}", upstream),
                None if e.is_rate_limit() => "The AI service is busy. Please try again shortly.".to_string(),
                None => "Could not reach the AI service. Please try again.".to_string(),
            },
            PlannerError::Parse(_) => "The AI response did not contain a usable plan.".to_string(),
            PlannerError::FeatureUnavailable(what) => {
                format!("{} is only available when a document is open.", what)
            }
            PlannerError::Document(_) => "The document could not be updated.".to_string(),
            PlannerError::Validation(msg) => msg.clone(),
            PlannerError::ItemNotFound(id) => format!("Section {} does not exist.", id),
            PlannerError::DeleteGuarded(_) => {
                "Remove this section from the plan before deleting it from the outline.".to_string()
            }
            PlannerError::Busy(what) => format!("{} is already running.", what),
            PlannerError::Store(_) => "Could not save to local storage.".to_string(),
            PlannerError::Ids(_) => "No more sections can be added to this plan.".to_string(),
        }
    }

    /// Whether the operation that failed left state untouched and may simply be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::Llm(e) => e.is_retryable(),
            PlannerError::Busy(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_user_message_uses_upstream_text() {
        let err = PlannerError::from(LlmError::ApiError {
            status: 401,
            message: "Invalid API key".to_string(),
        });
        assert_eq!(err.user_message(), "The AI service returned an error: Invalid API key");
    }

    #[test]
    fn test_user_message_is_short_for_transport_errors() {
        let err = PlannerError::from(LlmError::Timeout(Duration::from_secs(30)));
        assert!(!err.user_message().contains("30"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_feature_unavailable_message() {
        let err = PlannerError::FeatureUnavailable("Sync".to_string());
        assert_eq!(err.user_message(), "Sync is only available when a document is open.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_ids_exhausted_message() {
        let err = PlannerError::from(IdsExhausted { last_id: u32::MAX - 1 });
        assert_eq!(err.user_message(), "No more sections can be added to this plan.");
        assert!(!err.is_retryable());
    }
}
