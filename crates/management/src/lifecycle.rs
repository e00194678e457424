//! Campaign lifecycle: the state machine from draft to completion.
//!
//! Every operation validates against a consistent view of the tables and
//! mutates inside the same write section, so a failed guard leaves the
//! campaign, its links, recipients and approvals exactly as they were.
//! Audit entries are gathered during the transition and recorded after the
//! lock is released.

use chrono::{Duration, Utc};
use mailer_audience::{AudienceResolver, Expansion};
use mailer_core::audit::{noop_sink, AuditEntry, AuditSink};
use mailer_core::{Actor, CampaignCategory, CampaignStatus, MailerError, MailerResult, Role};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::approval::ApprovalGate;
use crate::attachments::{AttachmentStorage, AttachmentUpload, FsAttachmentStorage};
use crate::dispatch::{LoggingDispatcher, MailTestDispatcher};
use crate::models::*;
use crate::policy::PolicyStore;
use crate::state::{ensure_deletable, ensure_draft, next_status, CampaignAction};
use crate::store::{AccountRegistry, ManagementStore, Tables};

const ENTITY: &str = "campaign";

pub struct CampaignLifecycleManager {
    store: Arc<ManagementStore>,
    policy: Arc<PolicyStore>,
    resolver: Arc<AudienceResolver>,
    dispatcher: Arc<dyn MailTestDispatcher>,
    storage: Arc<dyn AttachmentStorage>,
    audit: Arc<dyn AuditSink>,
    internal_domains: Vec<String>,
}

impl CampaignLifecycleManager {
    pub fn new(
        store: Arc<ManagementStore>,
        policy: Arc<PolicyStore>,
        resolver: Arc<AudienceResolver>,
    ) -> Self {
        Self {
            store,
            policy,
            resolver,
            dispatcher: Arc::new(LoggingDispatcher),
            storage: Arc::new(FsAttachmentStorage::new("./data/attachments")),
            audit: noop_sink(),
            internal_domains: Vec::new(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn MailTestDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn AttachmentStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Test-send allowlist. Empty or containing `*` allows any domain.
    pub fn with_internal_domains(mut self, domains: Vec<String>) -> Self {
        self.internal_domains = domains
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    pub fn store(&self) -> &Arc<ManagementStore> {
        &self.store
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    pub fn get(&self, id: Uuid) -> MailerResult<Campaign> {
        self.store.read(|t| t.campaign(id).cloned())
    }

    /// Campaigns, newest first, optionally filtered by status.
    pub fn list(&self, status: Option<CampaignStatus>) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self.store.read(|t| {
            t.campaigns
                .values()
                .filter(|c| status.map_or(true, |s| c.status == s))
                .cloned()
                .collect()
        });
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn audience_ids(&self, id: Uuid) -> MailerResult<Vec<Uuid>> {
        self.store.read(|t| {
            t.campaign(id)?;
            Ok(t.linked_audience_ids(id))
        })
    }

    pub fn approvals(&self, id: Uuid) -> MailerResult<Vec<Approval>> {
        self.store.read(|t| {
            t.campaign(id)?;
            Ok(t.approvals_of(id).into_iter().cloned().collect())
        })
    }

    // ─── Authoring ─────────────────────────────────────────────────────────

    pub fn create(&self, req: CreateCampaignRequest, actor: &Actor) -> MailerResult<Campaign> {
        validate_content(&req.title, &req.subject)?;

        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            title: req.title,
            subject: req.subject,
            html_body: req.html_body,
            text_body: req.text_body,
            category: req.category,
            sender_identity_id: req.sender_identity_id,
            smtp_account_id: req.smtp_account_id,
            status: CampaignStatus::Draft,
            scheduled_at: None,
            send_window_start: None,
            send_window_end: None,
            emergency_bypass: false,
            emergency_reason: None,
            attachments: req.attachments,
            created_by: actor.email.clone(),
            created_at: now,
            updated_at: now,
        };
        self.store.write_with_accounts(|t, accounts| {
            self.validate_sending_selection(
                accounts,
                campaign.smtp_account_id,
                campaign.sender_identity_id,
            )?;
            t.campaigns.insert(campaign.id, campaign.clone());
            Ok::<_, MailerError>(())
        })?;

        info!(campaign_id = %campaign.id, category = ?campaign.category, "Campaign created");
        metrics::counter!("campaigns.created").increment(1);
        self.audit.record(self.entry("CAMPAIGN_CREATE", &campaign, actor));
        Ok(campaign)
    }

    /// Edit a draft, or reopen a completed campaign as a fresh draft.
    pub fn update(&self, id: Uuid, req: UpdateCampaignRequest, actor: &Actor) -> MailerResult<Campaign> {
        validate_content(&req.title, &req.subject)?;

        let (campaign, reopened) = self.store.write_with_accounts(|t, accounts| {
            let c = t.campaign_mut(id)?;
            self.validate_sending_selection(accounts, req.smtp_account_id, req.sender_identity_id)?;
            next_status(c.status, CampaignAction::Edit)?;
            let reopened = c.status == CampaignStatus::Completed;
            if reopened {
                c.reset_for_reuse();
            }
            c.title = req.title;
            c.subject = req.subject;
            c.html_body = req.html_body;
            c.text_body = req.text_body;
            c.category = req.category;
            c.sender_identity_id = req.sender_identity_id;
            c.smtp_account_id = req.smtp_account_id;
            if let Some(attachments) = req.attachments {
                c.attachments = attachments;
            }
            c.updated_at = Utc::now();
            Ok::<_, MailerError>((c.clone(), reopened))
        })?;

        info!(campaign_id = %id, reopened, "Campaign updated");
        self.audit.record(self.entry("CAMPAIGN_UPDATE", &campaign, actor));
        Ok(campaign)
    }

    /// Copy content and audience links into a new draft. Recipients and
    /// approvals are not copied; attachment metadata is.
    pub fn duplicate(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let copy = self.store.write(|t| {
            let source = t.campaign(id)?;
            let now = Utc::now();
            let copy = Campaign {
                id: Uuid::new_v4(),
                status: CampaignStatus::Draft,
                scheduled_at: None,
                send_window_start: None,
                send_window_end: None,
                emergency_bypass: false,
                emergency_reason: None,
                created_by: actor.email.clone(),
                created_at: now,
                updated_at: now,
                ..source.clone()
            };
            let links = t.linked_audience_ids(id);
            t.replace_links(copy.id, &links);
            t.campaigns.insert(copy.id, copy.clone());
            Ok::<_, MailerError>(copy)
        })?;

        info!(source_id = %id, campaign_id = %copy.id, "Campaign duplicated");
        self.audit.record(self.entry("CAMPAIGN_DUPLICATE", &copy, actor));
        Ok(copy)
    }

    /// Store the file first, then append its metadata. A storage failure
    /// leaves the attachment list untouched.
    pub fn add_attachment(
        &self,
        id: Uuid,
        upload: AttachmentUpload,
        actor: &Actor,
    ) -> MailerResult<Campaign> {
        let status = self.get(id)?.status;
        ensure_draft(status, "add attachment")?;
        if upload.bytes.is_empty() {
            return Err(MailerError::InvalidRequest("file required".into()));
        }

        let original_name = match upload.file_name.trim() {
            "" => "attachment".to_string(),
            name => name.to_string(),
        };
        let stored_name = self.storage.store(&upload.bytes, &original_name)?;
        let attachment = Attachment {
            id: Uuid::new_v4(),
            original_name,
            stored_name,
            size: upload.bytes.len() as u64,
            content_type: upload.content_type,
            uploaded_at: Utc::now(),
        };

        // Status may have moved while the file was written.
        let campaign = self.store.write(|t| {
            let c = t.campaign_mut(id)?;
            ensure_draft(c.status, "add attachment")?;
            c.attachments.push(attachment.clone());
            c.updated_at = Utc::now();
            Ok::<_, MailerError>(c.clone())
        })?;

        info!(campaign_id = %id, stored_name = %attachment.stored_name, "Attachment added");
        self.audit.record(AuditEntry::new(
            "CAMPAIGN_ATTACHMENT_ADD",
            ENTITY,
            id,
            actor,
            serde_json::to_value(&attachment).unwrap_or_default(),
        ));
        Ok(campaign)
    }

    pub fn delete(&self, id: Uuid, actor: &Actor) -> MailerResult<()> {
        let removed = self.store.write(|t| {
            ensure_deletable(t.campaign(id)?.status)?;
            t.remove_campaign_cascade(id)
                .ok_or_else(|| MailerError::not_found(format!("Campaign {}", id)))
        })?;

        info!(campaign_id = %id, "Campaign deleted");
        metrics::counter!("campaigns.deleted").increment(1);
        self.audit.record(self.entry("CAMPAIGN_DELETE", &removed, actor));
        Ok(())
    }

    // ─── Approval flow ─────────────────────────────────────────────────────

    /// Submit a draft with its target audiences. EMERGENCY campaigns
    /// submitted by a super admin skip approval and expand immediately.
    pub fn submit(&self, id: Uuid, req: SubmitCampaignRequest, actor: &Actor) -> MailerResult<Campaign> {
        let settings = self.policy.effective();

        let (campaign, entries, expanded) = self.store.write(|t| -> MailerResult<_> {
            let current = t.campaign(id)?;
            let category = current.category;
            let bypass = category == CampaignCategory::Emergency && actor.has_role(Role::SuperAdmin);
            let action = if bypass {
                CampaignAction::Bypass
            } else {
                CampaignAction::Submit
            };
            let mut status = next_status(current.status, action)?;

            let reason = req
                .emergency_reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            if bypass && reason.is_none() {
                return Err(MailerError::MissingReason);
            }

            t.audiences_in_order(&req.audience_ids)?;
            let expansion = if bypass && !req.audience_ids.is_empty() {
                Some(self.expand_within(t, &req.audience_ids)?)
            } else {
                None
            };

            let mut entries = Vec::new();
            t.replace_links(id, &req.audience_ids);
            t.delete_approvals_of(id);
            if bypass {
                let expanded = match expansion {
                    Some(expansion) => {
                        let total = expansion.total;
                        let per_audience = expansion.per_audience.clone();
                        t.replace_recipients(id, expansion.recipients);
                        Some((total, per_audience))
                    }
                    None => None,
                };
                let c = t.campaign_mut(id)?;
                c.emergency_bypass = true;
                c.emergency_reason = reason;
                c.status = status;
                entries.push(self.entry("EMERGENCY_BYPASS", c, actor));
                if let Some((total, per_audience)) = &expanded {
                    status = next_status(status, CampaignAction::Expand)?;
                    c.status = status;
                    entries.push(AuditEntry::new(
                        "CAMPAIGN_EXPAND",
                        ENTITY,
                        id,
                        actor,
                        json!({ "total": total, "per_audience": per_audience }),
                    ));
                }
                c.updated_at = Utc::now();
                let total = expanded.map(|(total, _)| total);
                entries.push(self.entry("CAMPAIGN_SUBMIT", c, actor));
                Ok((c.clone(), entries, total))
            } else {
                let roles = ApprovalGate::required_steps(category, &settings);
                for row in ApprovalGate::pending_rows(id, &roles) {
                    t.approvals.insert(row.id, row);
                }
                let c = t.campaign_mut(id)?;
                c.status = status;
                c.updated_at = Utc::now();
                entries.push(self.entry("CAMPAIGN_SUBMIT", c, actor));
                debug!(campaign_id = %id, steps = ?roles, "Approval steps created");
                Ok((c.clone(), entries, None))
            }
        })?;

        metrics::counter!("campaigns.submitted").increment(1);
        if campaign.emergency_bypass {
            warn!(
                campaign_id = %id,
                actor = %actor.email,
                reason = campaign.emergency_reason.as_deref().unwrap_or_default(),
                "Emergency bypass"
            );
            metrics::counter!("campaigns.emergency_bypass").increment(1);
        }
        if let Some(total) = expanded {
            metrics::counter!("campaigns.recipients_expanded").increment(total as u64);
        }
        info!(campaign_id = %id, status = ?campaign.status, "Campaign submitted");
        self.record_all(entries);
        Ok(campaign)
    }

    /// Called after each approval decision. Once every required approval is
    /// in, the campaign becomes APPROVED and its linked audiences expand.
    pub fn on_approval_complete(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let (campaign, entries) = self.store.write(|t| {
            let current = t.campaign(id)?;
            if current.status != CampaignStatus::PendingApproval
                || !ApprovalGate::all_satisfied(t.approvals_of(id))
            {
                return Ok((current.clone(), Vec::new()));
            }
            let mut status = next_status(current.status, CampaignAction::Approve)?;
            let links = t.linked_audience_ids(id);
            let expansion = if links.is_empty() {
                None
            } else {
                Some(self.expand_within(t, &links)?)
            };

            let mut entries = Vec::new();
            let expand_payload = expansion.map(|expansion| {
                let payload = json!({
                    "total": expansion.total,
                    "per_audience": expansion.per_audience,
                });
                t.replace_recipients(id, expansion.recipients);
                payload
            });
            let c = t.campaign_mut(id)?;
            c.status = status;
            entries.push(self.entry("CAMPAIGN_APPROVED", c, actor));
            if let Some(payload) = expand_payload {
                status = next_status(status, CampaignAction::Expand)?;
                c.status = status;
                entries.push(AuditEntry::new("CAMPAIGN_EXPAND", ENTITY, id, actor, payload));
            }
            c.updated_at = Utc::now();
            Ok::<_, MailerError>((c.clone(), entries))
        })?;

        if !entries.is_empty() {
            info!(campaign_id = %id, status = ?campaign.status, "Campaign approved");
            metrics::counter!("campaigns.approved").increment(1);
        }
        self.record_all(entries);
        Ok(campaign)
    }

    /// Record one approver's decision. The actor must hold the row's role
    /// (or be a super admin). Approval re-checks completion; rejection
    /// rejects the campaign.
    pub fn decide(
        &self,
        approval_id: Uuid,
        actor: &Actor,
        approved: bool,
        comment: Option<String>,
    ) -> MailerResult<Approval> {
        let (row, rejected) = self.store.write(|t| {
            let row = t
                .approvals
                .get(&approval_id)
                .ok_or_else(|| MailerError::not_found(format!("Approval {}", approval_id)))?;
            let campaign_id = row.campaign_id;
            let role = row.role;
            let already_decided = row.status != ApprovalStatus::Pending;
            let status = t.campaign(campaign_id)?.status;
            if already_decided || status != CampaignStatus::PendingApproval {
                return Err(MailerError::InvalidState {
                    current: status,
                    action: "decide approval",
                });
            }
            if !actor.has_role(role) && !actor.has_role(Role::SuperAdmin) {
                return Err(MailerError::Forbidden(format!("approval requires role {}", role)));
            }
            let rejected = if approved {
                None
            } else {
                Some(next_status(status, CampaignAction::Reject)?)
            };

            let row = t
                .approvals
                .get_mut(&approval_id)
                .ok_or_else(|| MailerError::not_found(format!("Approval {}", approval_id)))?;
            row.status = if approved {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Rejected
            };
            row.decided_by = Some(actor.email.clone());
            row.comment = comment;
            row.decided_at = Some(Utc::now());
            let row = row.clone();

            let rejected = match rejected {
                Some(next) => {
                    let c = t.campaign_mut(campaign_id)?;
                    c.status = next;
                    c.updated_at = Utc::now();
                    Some(c.clone())
                }
                None => None,
            };
            Ok::<_, MailerError>((row, rejected))
        })?;

        info!(
            approval_id = %approval_id,
            campaign_id = %row.campaign_id,
            role = %row.role,
            approved,
            "Approval decided"
        );
        self.audit.record(AuditEntry::new(
            if approved { "APPROVAL_APPROVE" } else { "APPROVAL_REJECT" },
            "approval",
            approval_id,
            actor,
            json!({ "campaign_id": row.campaign_id, "role": row.role, "comment": row.comment }),
        ));

        match rejected {
            Some(campaign) => {
                self.audit.record(self.entry("CAMPAIGN_REJECT", &campaign, actor));
            }
            None => {
                self.on_approval_complete(row.campaign_id, actor)?;
            }
        }
        Ok(row)
    }

    pub fn reject(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let campaign = self.transition(id, CampaignAction::Reject, |_| {})?;
        info!(campaign_id = %id, "Campaign rejected");
        self.audit.record(self.entry("CAMPAIGN_REJECT", &campaign, actor));
        Ok(campaign)
    }

    // ─── Delivery ──────────────────────────────────────────────────────────

    /// Set the send time and window. A window start without an end closes
    /// after the policy's `send_window_hours`.
    pub fn schedule(&self, id: Uuid, req: ScheduleCampaignRequest, actor: &Actor) -> MailerResult<Campaign> {
        let window_hours = i64::from(self.policy.effective().send_window_hours);
        let start = req.send_window_start;
        let end = match (start, req.send_window_end) {
            (Some(start), None) => Some(start + Duration::hours(window_hours)),
            (_, end) => end,
        };
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(MailerError::InvalidRequest(
                    "send window start must not be after its end".into(),
                ));
            }
        }

        let campaign = self.transition(id, CampaignAction::Schedule, |c| {
            c.scheduled_at = Some(req.scheduled_at);
            c.send_window_start = start;
            c.send_window_end = end;
        })?;

        info!(campaign_id = %id, scheduled_at = %req.scheduled_at, "Campaign scheduled");
        self.audit.record(self.entry("CAMPAIGN_SCHEDULE", &campaign, actor));
        Ok(campaign)
    }

    /// Replace the campaign's audience links and recipient rows with a fresh
    /// expansion of `audience_ids`. Not additive.
    pub fn expand_recipients(
        &self,
        id: Uuid,
        audience_ids: &[Uuid],
        actor: &Actor,
    ) -> MailerResult<ExpansionReport> {
        let report = self.store.write(|t| {
            let status = next_status(t.campaign(id)?.status, CampaignAction::Expand)?;
            let expansion = self.expand_within(t, audience_ids)?;

            t.replace_links(id, audience_ids);
            t.replace_recipients(id, expansion.recipients);
            let c = t.campaign_mut(id)?;
            c.status = status;
            c.updated_at = Utc::now();
            Ok::<_, MailerError>(ExpansionReport {
                campaign_id: id,
                status,
                total: expansion.total,
                per_audience: expansion.per_audience,
            })
        })?;

        info!(
            campaign_id = %id,
            total = report.total,
            status = ?report.status,
            "Recipients expanded"
        );
        metrics::counter!("campaigns.recipients_expanded").increment(report.total as u64);
        self.audit.record(AuditEntry::new(
            "CAMPAIGN_EXPAND",
            ENTITY,
            id,
            actor,
            json!({ "total": report.total, "per_audience": report.per_audience }),
        ));
        Ok(report)
    }

    pub fn queue_recipients(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let campaign = self.transition(id, CampaignAction::Queue, |_| {})?;
        info!(campaign_id = %id, "Campaign queued");
        self.audit.record(self.entry("CAMPAIGN_QUEUE", &campaign, actor));
        Ok(campaign)
    }

    /// Reset every recipient's delivery state and resume sending. The
    /// recipient set itself is unchanged.
    pub fn requeue(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let (campaign, reset) = self.store.write(|t| {
            let status = next_status(t.campaign(id)?.status, CampaignAction::Requeue)?;
            let now = Utc::now();
            let reset = t.reset_recipients(id, now);
            let c = t.campaign_mut(id)?;
            c.status = status;
            c.updated_at = now;
            Ok::<_, MailerError>((c.clone(), reset))
        })?;

        info!(campaign_id = %id, reset, "Campaign requeued");
        metrics::counter!("campaigns.requeued").increment(1);
        self.audit.record(self.entry("CAMPAIGN_REQUEUE", &campaign, actor));
        Ok(campaign)
    }

    /// Dispatcher hook: all recipients have been processed.
    pub fn complete(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let campaign = self.transition(id, CampaignAction::Complete, |_| {})?;
        info!(campaign_id = %id, "Campaign completed");
        self.audit.record(self.entry("CAMPAIGN_COMPLETE", &campaign, actor));
        Ok(campaign)
    }

    pub fn cancel(&self, id: Uuid, actor: &Actor) -> MailerResult<Campaign> {
        let campaign = self.transition(id, CampaignAction::Cancel, |_| {})?;
        info!(campaign_id = %id, "Campaign cancelled");
        self.audit.record(self.entry("CAMPAIGN_CANCEL", &campaign, actor));
        Ok(campaign)
    }

    /// Send test copies. Allowed in any status. Any per-recipient failure
    /// fails the whole call.
    pub fn test_send(&self, id: Uuid, recipients: &[String], actor: &Actor) -> MailerResult<()> {
        let campaign = self.get(id)?;
        let max = self.policy.effective().max_test_recipients;
        if recipients.len() > max as usize {
            return Err(MailerError::TooManyRecipients {
                requested: recipients.len(),
                max,
            });
        }
        for recipient in recipients {
            self.check_test_recipient(recipient)?;
        }

        let failures = self.dispatcher.send_test(&campaign, recipients);
        if !failures.is_empty() {
            warn!(campaign_id = %id, failures = failures.len(), "Test send failed");
            return Err(MailerError::DispatchFailed(failures));
        }

        info!(campaign_id = %id, recipients = recipients.len(), "Test send completed");
        metrics::counter!("campaigns.test_sends").increment(1);
        self.audit.record(AuditEntry::new(
            "CAMPAIGN_TEST_SEND",
            ENTITY,
            id,
            actor,
            json!({ "recipients": recipients }),
        ));
        Ok(())
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    /// Apply a plain status transition plus optional field edits atomically.
    fn transition(
        &self,
        id: Uuid,
        action: CampaignAction,
        edit: impl FnOnce(&mut Campaign),
    ) -> MailerResult<Campaign> {
        self.store.write(|t| {
            let c = t.campaign_mut(id)?;
            let next = next_status(c.status, action).map_err(|e| {
                warn!(campaign_id = %id, current = ?c.status, ?action, "Transition rejected");
                e
            })?;
            edit(c);
            c.status = next;
            c.updated_at = Utc::now();
            Ok(c.clone())
        })
    }

    fn expand_within(&self, t: &Tables, audience_ids: &[Uuid]) -> MailerResult<Expansion> {
        let audiences = t.audiences_in_order(audience_ids)?;
        self.resolver.expand(&audiences)
    }

    /// Called with the tables write lock held so the referenced records cannot
    /// be deleted before the campaign row is written.
    fn validate_sending_selection(
        &self,
        accounts: &AccountRegistry,
        smtp_account_id: Uuid,
        sender_identity_id: Uuid,
    ) -> MailerResult<()> {
        accounts.smtp_account(smtp_account_id)?;
        accounts.sender_identity(sender_identity_id)?;
        let settings = self.policy.effective();
        if settings.is_reserved_smtp_account(smtp_account_id) {
            return Err(MailerError::ReservedAccountConflict(
                "notification SMTP account cannot be used for campaigns".into(),
            ));
        }
        if settings.is_reserved_sender_identity(sender_identity_id) {
            return Err(MailerError::ReservedAccountConflict(
                "notification sender identity cannot be used for campaigns".into(),
            ));
        }
        Ok(())
    }

    fn check_test_recipient(&self, recipient: &str) -> MailerResult<()> {
        let (_, domain) = recipient
            .split_once('@')
            .ok_or_else(|| MailerError::InvalidRequest(format!("invalid recipient email '{}'", recipient)))?;
        if self.internal_domains.is_empty() || self.internal_domains.iter().any(|d| d == "*") {
            return Ok(());
        }
        let domain = domain.trim().to_lowercase();
        if self.internal_domains.iter().any(|d| *d == domain) {
            Ok(())
        } else {
            Err(MailerError::DomainNotAllowed(recipient.to_string()))
        }
    }

    fn entry(&self, action: &str, campaign: &Campaign, actor: &Actor) -> AuditEntry {
        AuditEntry::new(
            action,
            ENTITY,
            campaign.id,
            actor,
            json!({ "title": campaign.title, "status": campaign.status }),
        )
    }

    fn record_all(&self, entries: Vec<AuditEntry>) {
        for entry in entries {
            self.audit.record(entry);
        }
    }
}

fn validate_content(title: &str, subject: &str) -> MailerResult<()> {
    if title.trim().is_empty() {
        return Err(MailerError::InvalidRequest("title is required".into()));
    }
    if subject.trim().is_empty() {
        return Err(MailerError::InvalidRequest("subject is required".into()));
    }
    Ok(())
}
