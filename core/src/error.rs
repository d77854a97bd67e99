use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind} id: {id}")]
    UnknownId { kind: &'static str, id: String },

    #[error("cannot leave phase {phase}: {reason}")]
    GuardNotSatisfied { phase: String, reason: String },

    #[error("submission incomplete: {} slot(s) still empty", missing.len())]
    IncompleteSubmission { missing: Vec<String> },

    #[error("scenario closed: {0}")]
    ScenarioClosed(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    pub fn unknown_item(id: &str) -> Self {
        CoreError::UnknownId {
            kind: "item",
            id: id.to_string(),
        }
    }

    pub fn unknown_slot(id: &str) -> Self {
        CoreError::UnknownId {
            kind: "slot",
            id: id.to_string(),
        }
    }

    pub fn unknown_option(id: &str) -> Self {
        CoreError::UnknownId {
            kind: "option",
            id: id.to_string(),
        }
    }

    /// True for errors caused by a user action that the widget renders as feedback
    /// and recovers from. Everything else points at broken scenario data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::GuardNotSatisfied { .. }
                | CoreError::IncompleteSubmission { .. }
                | CoreError::ScenarioClosed(_)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            CoreError::GuardNotSatisfied { reason, .. } => reason.clone(),
            CoreError::IncompleteSubmission { .. } => {
                "Please fill all slots before submitting.".to_string()
            }
            CoreError::ScenarioClosed(_) => "This scenario has already been closed.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
