//! Campaign status transitions.

use mailer_core::{CampaignStatus, MailerError, MailerResult};
use serde::{Deserialize, Serialize};

/// An action that moves a campaign from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignAction {
    /// Draft | Completed -> Draft
    Edit,
    /// Draft -> PendingApproval
    Submit,
    /// Draft -> Approved (emergency bypass)
    Bypass,
    /// PendingApproval -> Approved
    Approve,
    /// PendingApproval -> Rejected
    Reject,
    /// Approved -> Scheduled
    Schedule,
    /// Approved -> Sending, Scheduled -> Scheduled
    Expand,
    /// any -> Sending
    Queue,
    /// any -> Sending; recipient delivery state is reset by the caller
    Requeue,
    /// Sending -> Completed
    Complete,
    /// any non-terminal -> Cancelled
    Cancel,
}

impl CampaignAction {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Edit => "update",
            Self::Submit => "submit",
            Self::Bypass => "bypass approval",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Schedule => "schedule",
            Self::Expand => "expand recipients",
            Self::Queue => "queue recipients",
            Self::Requeue => "requeue",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

/// Validate that `action` is allowed from `current` and return the target status.
pub fn next_status(current: CampaignStatus, action: CampaignAction) -> MailerResult<CampaignStatus> {
    use CampaignAction as A;
    use CampaignStatus as S;

    match (current, action) {
        (S::Draft | S::Completed, A::Edit) => Ok(S::Draft),
        (S::Draft, A::Submit) => Ok(S::PendingApproval),
        (S::Draft, A::Bypass) => Ok(S::Approved),
        (S::PendingApproval, A::Approve) => Ok(S::Approved),
        (S::PendingApproval, A::Reject) => Ok(S::Rejected),
        (S::Approved, A::Schedule) => Ok(S::Scheduled),
        (S::Approved, A::Expand) => Ok(S::Sending),
        (S::Scheduled, A::Expand) => Ok(S::Scheduled),
        (_, A::Queue | A::Requeue) => Ok(S::Sending),
        (S::Sending, A::Complete) => Ok(S::Completed),
        (s, A::Cancel) if !s.is_terminal() => Ok(S::Cancelled),
        _ => Err(MailerError::InvalidState {
            current,
            action: action.verb(),
        }),
    }
}

/// Deletion is the one guard that is not a transition.
pub fn ensure_deletable(current: CampaignStatus) -> MailerResult<()> {
    if current == CampaignStatus::Sending {
        return Err(MailerError::InvalidState {
            current,
            action: "delete",
        });
    }
    Ok(())
}

pub fn ensure_draft(current: CampaignStatus, action: &'static str) -> MailerResult<()> {
    if current != CampaignStatus::Draft {
        return Err(MailerError::InvalidState { current, action });
    }
    Ok(())
}
