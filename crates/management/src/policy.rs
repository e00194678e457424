//! Policy settings: approval composition rules, test-send limits, throttle
//! defaults and the sending account reserved for system notifications.
//!
//! A `PolicyStore` is built explicitly from `PolicyConfig` at startup and
//! handed to the services that need it. `update` is the admin write path;
//! `reload` is the refresh point for settings persisted elsewhere.

use chrono::{DateTime, Utc};
use mailer_core::audit::{noop_sink, AuditEntry, AuditSink};
use mailer_core::config::PolicyConfig;
use mailer_core::{Actor, MailerError, MailerResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrgWideRule {
    #[serde(rename = "HR_ADMIN+APPROVER")]
    HrAdminAndApprover,
    #[serde(rename = "APPROVER")]
    Approver,
}

impl OrgWideRule {
    pub fn parse(raw: &str) -> MailerResult<Self> {
        match raw {
            "HR_ADMIN+APPROVER" => Ok(Self::HrAdminAndApprover),
            "APPROVER" => Ok(Self::Approver),
            "" => Err(MailerError::InvalidPolicy("approval rule required".into())),
            other => Err(MailerError::InvalidPolicy(format!(
                "invalid org-wide approval rule '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepartmentRule {
    DeptAdmin,
    Approver,
}

impl DepartmentRule {
    pub fn parse(raw: &str) -> MailerResult<Self> {
        match raw {
            "DEPT_ADMIN" => Ok(Self::DeptAdmin),
            "APPROVER" => Ok(Self::Approver),
            "" => Err(MailerError::InvalidPolicy("approval rule required".into())),
            other => Err(MailerError::InvalidPolicy(format!(
                "invalid department approval rule '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    pub org_wide_rule: OrgWideRule,
    pub department_rule: DepartmentRule,
    pub max_test_recipients: u32,
    pub default_throttle_per_minute: u32,
    pub send_window_hours: u32,
    pub notification_smtp_account_id: Option<Uuid>,
    pub notification_sender_identity_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl PolicySettings {
    pub fn from_config(cfg: &PolicyConfig) -> Self {
        Self {
            org_wide_rule: OrgWideRule::HrAdminAndApprover,
            department_rule: if cfg.dept_approval_enabled {
                DepartmentRule::DeptAdmin
            } else {
                DepartmentRule::Approver
            },
            max_test_recipients: cfg.max_test_recipients.max(1),
            default_throttle_per_minute: cfg.default_throttle_per_minute.max(1),
            send_window_hours: cfg.send_window_hours.max(1),
            notification_smtp_account_id: None,
            notification_sender_identity_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_reserved_smtp_account(&self, id: Uuid) -> bool {
        self.notification_smtp_account_id == Some(id)
    }

    pub fn is_reserved_sender_identity(&self, id: Uuid) -> bool {
        self.notification_sender_identity_id == Some(id)
    }
}

/// Admin update payload. Rules arrive as literals and are validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettingsRequest {
    pub org_wide_rule: String,
    pub department_rule: String,
    pub max_test_recipients: u32,
    pub default_throttle_per_minute: u32,
    pub send_window_hours: u32,
    #[serde(default)]
    pub notification_smtp_account_id: Option<Uuid>,
    #[serde(default)]
    pub notification_sender_identity_id: Option<Uuid>,
}

pub struct PolicyStore {
    settings: RwLock<PolicySettings>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyStore {
    pub fn new(defaults: &PolicyConfig) -> Self {
        let settings = PolicySettings::from_config(defaults);
        info!(
            org_wide_rule = ?settings.org_wide_rule,
            department_rule = ?settings.department_rule,
            max_test_recipients = settings.max_test_recipients,
            "Policy settings initialized"
        );
        Self {
            settings: RwLock::new(settings),
            audit: noop_sink(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Settings as shown to administrators.
    pub fn get(&self) -> PolicySettings {
        self.effective()
    }

    /// Settings used by business logic.
    pub fn effective(&self) -> PolicySettings {
        self.settings.read().clone()
    }

    pub fn update(&self, req: PolicySettingsRequest, actor: &Actor) -> MailerResult<PolicySettings> {
        let org_wide_rule = OrgWideRule::parse(req.org_wide_rule.trim())?;
        let department_rule = DepartmentRule::parse(req.department_rule.trim())?;
        let settings = PolicySettings {
            org_wide_rule,
            department_rule,
            max_test_recipients: req.max_test_recipients,
            default_throttle_per_minute: req.default_throttle_per_minute,
            send_window_hours: req.send_window_hours,
            notification_smtp_account_id: non_nil(req.notification_smtp_account_id),
            notification_sender_identity_id: non_nil(req.notification_sender_identity_id),
            updated_at: Utc::now(),
        };
        validate(&settings)?;

        *self.settings.write() = settings.clone();
        info!(
            org_wide_rule = ?settings.org_wide_rule,
            department_rule = ?settings.department_rule,
            actor = %actor.email,
            "Policy settings updated"
        );
        self.audit.record(AuditEntry::new(
            "POLICY_UPDATE",
            "policy_settings",
            1,
            actor,
            serde_json::to_value(&settings).unwrap_or_default(),
        ));
        Ok(settings)
    }

    /// Replace the in-memory settings with an externally persisted copy.
    pub fn reload(&self, settings: PolicySettings) -> MailerResult<()> {
        validate(&settings)?;
        *self.settings.write() = settings;
        info!("Policy settings reloaded");
        Ok(())
    }
}

fn non_nil(id: Option<Uuid>) -> Option<Uuid> {
    id.filter(|id| !id.is_nil())
}

fn validate(settings: &PolicySettings) -> MailerResult<()> {
    if settings.max_test_recipients < 1
        || settings.default_throttle_per_minute < 1
        || settings.send_window_hours < 1
    {
        return Err(MailerError::InvalidPolicy(
            "limits must be at least 1".into(),
        ));
    }
    let has_smtp = settings.notification_smtp_account_id.is_some();
    let has_sender = settings.notification_sender_identity_id.is_some();
    if has_smtp != has_sender {
        return Err(MailerError::InvalidPolicy(
            "notification SMTP account and sender identity must both be set or both be empty"
                .into(),
        ));
    }
    Ok(())
}
