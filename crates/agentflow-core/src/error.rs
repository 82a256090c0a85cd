use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("phase '{phase}' is not part of the {variant} workflow")]
    UnknownPhase { phase: String, variant: String },

    #[error("malformed phase chain: {0}")]
    MalformedChain(String),

    #[error("invalid role '{0}': expected coordinator, implementer or verifier")]
    InvalidRole(String),

    #[error("invalid workflow variant: {0}")]
    InvalidVariant(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("version control: {0}")]
    Vcs(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    pub(crate) fn required(field: &str) -> Self {
        FlowError::Validation {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        }
    }

    /// Configuration errors are fatal and never retried.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            FlowError::InvalidPhase(_)
                | FlowError::UnknownPhase { .. }
                | FlowError::MalformedChain(_)
                | FlowError::InvalidVariant(_)
                | FlowError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
