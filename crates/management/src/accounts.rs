//! SMTP accounts and sender identities.
//!
//! Deletion is refused while the record is the reserved notification one or
//! is still referenced. Reference checks and the registry change run in one
//! store write section.

use chrono::Utc;
use mailer_core::audit::{noop_sink, AuditEntry, AuditSink};
use mailer_core::{Actor, MailerError, MailerResult};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{SenderIdentity, SenderIdentityRequest, SmtpAccount, SmtpAccountRequest};
use crate::policy::PolicyStore;
use crate::store::ManagementStore;

pub struct AccountService {
    store: Arc<ManagementStore>,
    policy: Arc<PolicyStore>,
    audit: Arc<dyn AuditSink>,
}

impl AccountService {
    pub fn new(store: Arc<ManagementStore>, policy: Arc<PolicyStore>) -> Self {
        Self {
            store,
            policy,
            audit: noop_sink(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    // ─── SMTP accounts ─────────────────────────────────────────────────────

    pub fn list_smtp_accounts(&self) -> Vec<SmtpAccount> {
        self.store.list_smtp_accounts()
    }

    pub fn create_smtp_account(&self, req: SmtpAccountRequest, actor: &Actor) -> MailerResult<SmtpAccount> {
        validate_smtp(&req)?;
        let account = SmtpAccount {
            id: Uuid::new_v4(),
            name: req.name,
            host: req.host,
            port: req.port,
            username: req.username,
            use_tls: req.use_tls,
            throttle_per_minute: req.throttle_per_minute,
            created_at: Utc::now(),
        };
        self.store.write_with_accounts(|_, accounts| {
            accounts.smtp_accounts().insert(account.id, account.clone())
        });

        info!(smtp_account_id = %account.id, host = %account.host, "SMTP account created");
        self.record("SMTP_ACCOUNT_CREATE", "smtp_account", account.id, actor, json!({ "name": account.name }));
        Ok(account)
    }

    pub fn update_smtp_account(
        &self,
        id: Uuid,
        req: SmtpAccountRequest,
        actor: &Actor,
    ) -> MailerResult<SmtpAccount> {
        validate_smtp(&req)?;
        let account = self.store.write_with_accounts(|_, accounts| {
            let mut entry = accounts
                .smtp_accounts()
                .get_mut(&id)
                .ok_or_else(|| MailerError::not_found(format!("SMTP account {}", id)))?;
            let account = entry.value_mut();
            account.name = req.name;
            account.host = req.host;
            account.port = req.port;
            account.username = req.username;
            account.use_tls = req.use_tls;
            account.throttle_per_minute = req.throttle_per_minute;
            Ok::<_, MailerError>(account.clone())
        })?;

        info!(smtp_account_id = %id, "SMTP account updated");
        self.record("SMTP_ACCOUNT_UPDATE", "smtp_account", id, actor, json!({ "name": account.name }));
        Ok(account)
    }

    pub fn delete_smtp_account(&self, id: Uuid, actor: &Actor) -> MailerResult<()> {
        let settings = self.policy.effective();
        self.store.write_with_accounts(|t, accounts| {
            accounts.smtp_account(id)?;
            if settings.is_reserved_smtp_account(id) {
                return Err(MailerError::InUse(
                    "SMTP account is reserved for notifications".into(),
                ));
            }
            if accounts
                .sender_identities()
                .iter()
                .any(|r| r.smtp_account_id == id)
            {
                return Err(MailerError::InUse(
                    "SMTP account is used by a sender identity".into(),
                ));
            }
            if t.campaigns.values().any(|c| c.smtp_account_id == id) {
                return Err(MailerError::InUse("SMTP account is used by a campaign".into()));
            }
            accounts.smtp_accounts().remove(&id);
            Ok::<_, MailerError>(())
        })?;

        info!(smtp_account_id = %id, "SMTP account deleted");
        self.record("SMTP_ACCOUNT_DELETE", "smtp_account", id, actor, json!({}));
        Ok(())
    }

    // ─── Sender identities ─────────────────────────────────────────────────

    pub fn list_sender_identities(&self) -> Vec<SenderIdentity> {
        self.store.list_sender_identities()
    }

    pub fn create_sender_identity(
        &self,
        req: SenderIdentityRequest,
        actor: &Actor,
    ) -> MailerResult<SenderIdentity> {
        validate_identity(&req)?;
        let identity = SenderIdentity {
            id: Uuid::new_v4(),
            display_name: req.display_name,
            email: req.email.trim().to_lowercase(),
            smtp_account_id: req.smtp_account_id,
            created_at: Utc::now(),
        };
        self.store.write_with_accounts(|_, accounts| {
            accounts.smtp_account(identity.smtp_account_id)?;
            accounts
                .sender_identities()
                .insert(identity.id, identity.clone());
            Ok::<_, MailerError>(())
        })?;

        info!(sender_identity_id = %identity.id, email = %identity.email, "Sender identity created");
        self.record(
            "SENDER_IDENTITY_CREATE",
            "sender_identity",
            identity.id,
            actor,
            json!({ "email": identity.email }),
        );
        Ok(identity)
    }

    pub fn update_sender_identity(
        &self,
        id: Uuid,
        req: SenderIdentityRequest,
        actor: &Actor,
    ) -> MailerResult<SenderIdentity> {
        validate_identity(&req)?;
        let identity = self.store.write_with_accounts(|_, accounts| {
            accounts.smtp_account(req.smtp_account_id)?;
            let mut entry = accounts
                .sender_identities()
                .get_mut(&id)
                .ok_or_else(|| MailerError::not_found(format!("Sender identity {}", id)))?;
            let identity = entry.value_mut();
            identity.display_name = req.display_name;
            identity.email = req.email.trim().to_lowercase();
            identity.smtp_account_id = req.smtp_account_id;
            Ok::<_, MailerError>(identity.clone())
        })?;

        info!(sender_identity_id = %id, "Sender identity updated");
        self.record(
            "SENDER_IDENTITY_UPDATE",
            "sender_identity",
            id,
            actor,
            json!({ "email": identity.email }),
        );
        Ok(identity)
    }

    pub fn delete_sender_identity(&self, id: Uuid, actor: &Actor) -> MailerResult<()> {
        let settings = self.policy.effective();
        self.store.write_with_accounts(|t, accounts| {
            accounts.sender_identity(id)?;
            if settings.is_reserved_sender_identity(id) {
                return Err(MailerError::InUse(
                    "sender identity is reserved for notifications".into(),
                ));
            }
            if t.campaigns.values().any(|c| c.sender_identity_id == id) {
                return Err(MailerError::InUse(
                    "sender identity is used by a campaign".into(),
                ));
            }
            accounts.sender_identities().remove(&id);
            Ok::<_, MailerError>(())
        })?;

        info!(sender_identity_id = %id, "Sender identity deleted");
        self.record("SENDER_IDENTITY_DELETE", "sender_identity", id, actor, json!({}));
        Ok(())
    }

    fn record(&self, action: &str, entity_type: &str, id: Uuid, actor: &Actor, payload: serde_json::Value) {
        self.audit
            .record(AuditEntry::new(action, entity_type, id, actor, payload));
    }
}

fn validate_smtp(req: &SmtpAccountRequest) -> MailerResult<()> {
    if req.name.trim().is_empty() || req.host.trim().is_empty() {
        return Err(MailerError::InvalidRequest(
            "SMTP account name and host are required".into(),
        ));
    }
    if req.port == 0 {
        return Err(MailerError::InvalidRequest("SMTP port must be non-zero".into()));
    }
    if req.throttle_per_minute == Some(0) {
        return Err(MailerError::InvalidRequest(
            "throttle must be at least 1 per minute".into(),
        ));
    }
    Ok(())
}

fn validate_identity(req: &SenderIdentityRequest) -> MailerResult<()> {
    if !req.email.contains('@') {
        return Err(MailerError::InvalidRequest(format!(
            "invalid sender email '{}'",
            req.email
        )));
    }
    Ok(())
}
