use thiserror::Error;

use crate::types::CampaignStatus;

pub type MailerResult<T> = Result<T, MailerError>;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Campaign is {current:?}; cannot {action}")]
    InvalidState {
        current: CampaignStatus,
        action: &'static str,
    },

    #[error("Reserved notification account conflict: {0}")]
    ReservedAccountConflict(String),

    #[error("Invalid policy settings: {0}")]
    InvalidPolicy(String),

    #[error("Invalid audience rule: {0}")]
    InvalidRule(String),

    #[error("Emergency reason required")]
    MissingReason,

    #[error("Too many test recipients: {requested} exceeds limit of {max}")]
    TooManyRecipients { requested: usize, max: u32 },

    #[error("Recipient outside internal domains: {0}")]
    DomainNotAllowed(String),

    #[error("Conflict: {0}")]
    InUse(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Test send failed: {}", .0.join("; "))]
    DispatchFailed(Vec<String>),

    #[error("Attachment storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MailerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::ReservedAccountConflict(_) => "reserved_account_conflict",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::InvalidRule(_) => "invalid_rule",
            Self::MissingReason => "missing_reason",
            Self::TooManyRecipients { .. } => "too_many_recipients",
            Self::DomainNotAllowed(_) => "domain_not_allowed",
            Self::InUse(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidRequest(_) => "invalid_request",
            Self::DispatchFailed(_) => "dispatch_failed",
            Self::StorageError(_) => "storage_error",
            Self::Serialization(_) | Self::Io(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the message is safe to show to API clients. Storage and
    /// internal failures are generalised.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::StorageError(_) | Self::Serialization(_) | Self::Io(_) | Self::Internal(_)
        )
    }
}
