//! Management domain types: campaigns, recipients, approvals, sending accounts.

use chrono::{DateTime, Utc};
use mailer_audience::{AudienceCount, AudienceRule};
use mailer_core::{CampaignCategory, CampaignStatus, RecipientStatus, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub category: CampaignCategory,
    pub sender_identity_id: Uuid,
    pub smtp_account_id: Uuid,
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub send_window_start: Option<DateTime<Utc>>,
    pub send_window_end: Option<DateTime<Utc>>,
    pub emergency_bypass: bool,
    pub emergency_reason: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Clear everything tied to a previous send so the campaign can be reused.
    pub fn reset_for_reuse(&mut self) {
        self.status = CampaignStatus::Draft;
        self.scheduled_at = None;
        self.send_window_start = None;
        self.send_window_end = None;
        self.emergency_bypass = false;
        self.emergency_reason = None;
    }
}

/// Metadata for a stored attachment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Campaign × audience join row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAudience {
    pub campaign_id: Uuid,
    pub audience_id: Uuid,
}

// ─── Recipients ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecipient {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub audience_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub status: RecipientStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ─── Approvals ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// One required sign-off by a role for a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub role: Role,
    pub status: ApprovalStatus,
    pub decided_by: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

// ─── Sending accounts ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpAccount {
    pub id: Uuid,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub use_tls: bool,
    pub throttle_per_minute: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderIdentity {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub smtp_account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ─── API Request/Response types ────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub text_body: Option<String>,
    pub category: CampaignCategory,
    pub sender_identity_id: Uuid,
    pub smtp_account_id: Uuid,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCampaignRequest {
    pub title: String,
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub text_body: Option<String>,
    pub category: CampaignCategory,
    pub sender_identity_id: Uuid,
    pub smtp_account_id: Uuid,
    /// Replaces the attachment list when present.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitCampaignRequest {
    #[serde(default)]
    pub audience_ids: Vec<Uuid>,
    #[serde(default)]
    pub emergency_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCampaignRequest {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub send_window_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub send_window_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpandRecipientsRequest {
    pub audience_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionReport {
    pub campaign_id: Uuid,
    pub status: CampaignStatus,
    pub total: usize,
    pub per_audience: Vec<AudienceCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSendRequest {
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDecisionRequest {
    pub approved: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudienceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<AudienceRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpAccountRequest {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub throttle_per_minute: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderIdentityRequest {
    pub display_name: String,
    pub email: String,
    pub smtp_account_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub campaign_id: Uuid,
    pub total: usize,
    pub queued: usize,
    pub sending: usize,
    pub sent: usize,
    pub failed: usize,
    pub bounced: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
