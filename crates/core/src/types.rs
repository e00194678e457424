use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    PendingApproval,
    Approved,
    Scheduled,
    Sending,
    Completed,
    Rejected,
    Cancelled,
}

impl CampaignStatus {
    /// Statuses during which linked audiences are frozen.
    pub const ACTIVE: [CampaignStatus; 5] = [
        CampaignStatus::Draft,
        CampaignStatus::PendingApproval,
        CampaignStatus::Approved,
        CampaignStatus::Scheduled,
        CampaignStatus::Sending,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// Completed is terminal unless the campaign is re-edited.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed | CampaignStatus::Rejected | CampaignStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignCategory {
    General,
    Departmental,
    OrgWide,
    Emergency,
}

/// Delivery state of a single recipient row. Everything past `Queued` is
/// written by the background dispatcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientStatus {
    Queued,
    Sending,
    Sent,
    Failed,
    Bounced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    HrAdmin,
    DeptAdmin,
    Approver,
    Sender,
    Auditor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::HrAdmin => "HR_ADMIN",
            Role::DeptAdmin => "DEPT_ADMIN",
            Role::Approver => "APPROVER",
            Role::Sender => "SENDER",
            Role::Auditor => "AUDITOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of a core operation, as resolved by the
/// transport layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub roles: BTreeSet<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role.as_str().to_string());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&CampaignStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"PENDING_APPROVAL\"");
        let parsed: CampaignCategory = serde_json::from_str("\"ORG_WIDE\"").unwrap();
        assert_eq!(parsed, CampaignCategory::OrgWide);
    }

    #[test]
    fn test_active_and_terminal() {
        assert!(CampaignStatus::Sending.is_active());
        assert!(!CampaignStatus::Cancelled.is_active());
        assert!(CampaignStatus::Completed.is_terminal());
        assert!(!CampaignStatus::Scheduled.is_terminal());
    }

    #[test]
    fn test_actor_roles() {
        let actor = Actor::new("ops@corp.example.com").with_role(Role::SuperAdmin);
        assert!(actor.has_role(Role::SuperAdmin));
        assert!(!actor.has_role(Role::Approver));
    }
}
