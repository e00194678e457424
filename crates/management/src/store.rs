//! In-memory management store.
//!
//! Relational rows (campaigns, audiences, links, recipients, approvals) sit in
//! one `RwLock<Tables>` arena keyed by `Uuid`, so every compound transition is
//! a single write-lock critical section and readers never see it half done.
//! Sending accounts live in `DashMap` registries that are only handed out
//! for mutation together with the tables write lock, so a reference check
//! against campaigns and the registry change it guards are one critical
//! section.

use crate::models::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mailer_audience::{Audience, RecipientSpec};
use mailer_core::{CampaignStatus, MailerError, MailerResult, RecipientStatus};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Row storage. Foreign keys are explicit `Uuid` fields.
#[derive(Default)]
pub struct Tables {
    pub campaigns: HashMap<Uuid, Campaign>,
    pub audiences: HashMap<Uuid, Audience>,
    pub links: Vec<CampaignAudience>,
    pub recipients: Vec<CampaignRecipient>,
    pub approvals: HashMap<Uuid, Approval>,
}

impl Tables {
    pub fn campaign(&self, id: Uuid) -> MailerResult<&Campaign> {
        self.campaigns
            .get(&id)
            .ok_or_else(|| MailerError::not_found(format!("Campaign {}", id)))
    }

    pub fn campaign_mut(&mut self, id: Uuid) -> MailerResult<&mut Campaign> {
        self.campaigns
            .get_mut(&id)
            .ok_or_else(|| MailerError::not_found(format!("Campaign {}", id)))
    }

    pub fn audience(&self, id: Uuid) -> MailerResult<&Audience> {
        self.audiences
            .get(&id)
            .ok_or_else(|| MailerError::not_found(format!("Audience {}", id)))
    }

    /// Resolve audience ids in order, failing on the first unknown id.
    pub fn audiences_in_order(&self, ids: &[Uuid]) -> MailerResult<Vec<&Audience>> {
        ids.iter().map(|id| self.audience(*id)).collect()
    }

    /// Distinct linked audience ids, in link order.
    pub fn linked_audience_ids(&self, campaign_id: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.links
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .map(|l| l.audience_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Replace a campaign's audience links wholesale, deduplicated by id.
    pub fn replace_links(&mut self, campaign_id: Uuid, audience_ids: &[Uuid]) {
        self.links.retain(|l| l.campaign_id != campaign_id);
        let mut seen = HashSet::new();
        for audience_id in audience_ids {
            if seen.insert(*audience_id) {
                self.links.push(CampaignAudience {
                    campaign_id,
                    audience_id: *audience_id,
                });
            }
        }
    }

    /// Delete all recipient rows of a campaign and insert fresh QUEUED rows.
    pub fn replace_recipients(&mut self, campaign_id: Uuid, specs: Vec<RecipientSpec>) {
        let now = Utc::now();
        self.recipients.retain(|r| r.campaign_id != campaign_id);
        self.recipients
            .extend(specs.into_iter().map(|spec| CampaignRecipient {
                id: Uuid::new_v4(),
                campaign_id,
                audience_id: spec.audience_id,
                email: spec.email,
                full_name: spec.full_name,
                status: RecipientStatus::Queued,
                retry_count: 0,
                last_error: None,
                updated_at: now,
            }));
    }

    /// Reset delivery state of every recipient row of a campaign in place.
    pub fn reset_recipients(&mut self, campaign_id: Uuid, now: DateTime<Utc>) -> usize {
        let mut reset = 0;
        for r in self.recipients.iter_mut().filter(|r| r.campaign_id == campaign_id) {
            r.status = RecipientStatus::Queued;
            r.retry_count = 0;
            r.last_error = None;
            r.updated_at = now;
            reset += 1;
        }
        reset
    }

    pub fn recipients_of(&self, campaign_id: Uuid) -> impl Iterator<Item = &CampaignRecipient> {
        self.recipients
            .iter()
            .filter(move |r| r.campaign_id == campaign_id)
    }

    pub fn approvals_of(&self, campaign_id: Uuid) -> Vec<&Approval> {
        let mut rows: Vec<&Approval> = self
            .approvals
            .values()
            .filter(|a| a.campaign_id == campaign_id)
            .collect();
        rows.sort_by_key(|a| (a.created_at, a.role));
        rows
    }

    pub fn delete_approvals_of(&mut self, campaign_id: Uuid) {
        self.approvals.retain(|_, a| a.campaign_id != campaign_id);
    }

    /// Remove a campaign together with its links, recipients and approvals.
    pub fn remove_campaign_cascade(&mut self, campaign_id: Uuid) -> Option<Campaign> {
        self.links.retain(|l| l.campaign_id != campaign_id);
        self.recipients.retain(|r| r.campaign_id != campaign_id);
        self.delete_approvals_of(campaign_id);
        self.campaigns.remove(&campaign_id)
    }

    /// Number of links from an audience to campaigns in an active status.
    pub fn active_links_for_audience(&self, audience_id: Uuid) -> usize {
        self.links
            .iter()
            .filter(|l| l.audience_id == audience_id)
            .filter(|l| {
                self.campaigns
                    .get(&l.campaign_id)
                    .is_some_and(|c| c.status.is_active())
            })
            .count()
    }
}

/// SMTP accounts and sender identities.
#[derive(Default)]
pub struct AccountRegistry {
    smtp_accounts: DashMap<Uuid, SmtpAccount>,
    sender_identities: DashMap<Uuid, SenderIdentity>,
}

impl AccountRegistry {
    pub fn smtp_account(&self, id: Uuid) -> MailerResult<SmtpAccount> {
        self.smtp_accounts
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| MailerError::not_found(format!("SMTP account {}", id)))
    }

    pub fn sender_identity(&self, id: Uuid) -> MailerResult<SenderIdentity> {
        self.sender_identities
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| MailerError::not_found(format!("Sender identity {}", id)))
    }

    pub fn smtp_accounts(&self) -> &DashMap<Uuid, SmtpAccount> {
        &self.smtp_accounts
    }

    pub fn sender_identities(&self) -> &DashMap<Uuid, SenderIdentity> {
        &self.sender_identities
    }
}

/// Thread-safe in-memory store for campaigns, audiences, recipients,
/// approvals and sending accounts.
pub struct ManagementStore {
    tables: RwLock<Tables>,
    accounts: AccountRegistry,
}

impl ManagementStore {
    pub fn new() -> Self {
        info!("Management store initialized (in-memory)");
        Self {
            tables: RwLock::new(Tables::default()),
            accounts: AccountRegistry::default(),
        }
    }

    /// Run `f` against a consistent snapshot of the tables.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&*self.tables.read())
    }

    /// Run `f` as one atomic unit. Callers validate before mutating so an
    /// `Err` leaves the tables untouched.
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        f(&mut *self.tables.write())
    }

    /// Like [`write`](Self::write), with the account registries. Every
    /// registry mutation goes through here.
    pub fn write_with_accounts<R>(&self, f: impl FnOnce(&mut Tables, &AccountRegistry) -> R) -> R {
        f(&mut *self.tables.write(), &self.accounts)
    }

    // ─── Sending accounts ──────────────────────────────────────────────────

    /// SMTP accounts, oldest first.
    pub fn list_smtp_accounts(&self) -> Vec<SmtpAccount> {
        let mut accounts: Vec<SmtpAccount> = self
            .accounts
            .smtp_accounts
            .iter()
            .map(|r| r.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        accounts
    }

    /// Sender identities, oldest first.
    pub fn list_sender_identities(&self) -> Vec<SenderIdentity> {
        let mut identities: Vec<SenderIdentity> = self
            .accounts
            .sender_identities
            .iter()
            .map(|r| r.value().clone())
            .collect();
        identities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        identities
    }

    // ─── Dispatcher hooks ──────────────────────────────────────────────────

    /// QUEUED recipients of campaigns currently SENDING, oldest first.
    pub fn next_queued(&self, limit: usize) -> Vec<CampaignRecipient> {
        self.read(|t| {
            let mut queued: Vec<CampaignRecipient> = t
                .recipients
                .iter()
                .filter(|r| r.status == RecipientStatus::Queued)
                .filter(|r| {
                    t.campaigns
                        .get(&r.campaign_id)
                        .is_some_and(|c| c.status == CampaignStatus::Sending)
                })
                .cloned()
                .collect();
            queued.sort_by_key(|r| r.updated_at);
            queued.truncate(limit);
            queued
        })
    }

    /// Record a delivery outcome reported by the dispatcher. Failures bump
    /// the retry count.
    pub fn record_delivery(
        &self,
        recipient_id: Uuid,
        status: RecipientStatus,
        error: Option<String>,
    ) -> MailerResult<CampaignRecipient> {
        self.write(|t| {
            let row = t
                .recipients
                .iter_mut()
                .find(|r| r.id == recipient_id)
                .ok_or_else(|| MailerError::not_found(format!("Recipient {}", recipient_id)))?;
            if status == RecipientStatus::Failed {
                row.retry_count += 1;
            }
            row.status = status;
            row.last_error = error;
            row.updated_at = Utc::now();
            debug!(recipient_id = %recipient_id, ?status, "Delivery recorded");
            Ok(row.clone())
        })
    }
}

impl Default for ManagementStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailer_core::CampaignCategory;

    fn campaign(status: CampaignStatus) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            title: "Open enrollment".into(),
            subject: "Benefits open enrollment".into(),
            html_body: "<p>Enroll now</p>".into(),
            text_body: None,
            category: CampaignCategory::General,
            sender_identity_id: Uuid::new_v4(),
            smtp_account_id: Uuid::new_v4(),
            status,
            scheduled_at: None,
            send_window_start: None,
            send_window_end: None,
            emergency_bypass: false,
            emergency_reason: None,
            attachments: Vec::new(),
            created_by: "hr@corp.example.com".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn spec(email: &str, audience_id: Uuid) -> RecipientSpec {
        RecipientSpec {
            email: email.into(),
            full_name: email.into(),
            audience_id,
        }
    }

    #[test]
    fn test_replace_links_dedups() {
        let mut t = Tables::default();
        let (c, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        t.replace_links(c, &[a, b, a]);
        assert_eq!(t.linked_audience_ids(c), vec![a, b]);
        t.replace_links(c, &[b]);
        assert_eq!(t.linked_audience_ids(c), vec![b]);
    }

    #[test]
    fn test_replace_recipients_is_not_additive() {
        let mut t = Tables::default();
        let (c, other, a) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        t.replace_recipients(other, vec![spec("keep@x.com", a)]);
        t.replace_recipients(c, vec![spec("a@x.com", a), spec("b@x.com", a)]);
        t.replace_recipients(c, vec![spec("a@x.com", a)]);
        assert_eq!(t.recipients_of(c).count(), 1);
        assert_eq!(t.recipients_of(other).count(), 1);
    }

    #[test]
    fn test_cascade_and_active_links() {
        let mut t = Tables::default();
        let live = campaign(CampaignStatus::Approved);
        let done = campaign(CampaignStatus::Cancelled);
        let audience_id = Uuid::new_v4();
        let (live_id, done_id) = (live.id, done.id);
        t.campaigns.insert(live_id, live);
        t.campaigns.insert(done_id, done);
        t.replace_links(live_id, &[audience_id]);
        t.replace_links(done_id, &[audience_id]);
        t.replace_recipients(live_id, vec![spec("a@x.com", audience_id)]);

        assert_eq!(t.active_links_for_audience(audience_id), 1);
        assert!(t.remove_campaign_cascade(live_id).is_some());
        assert_eq!(t.active_links_for_audience(audience_id), 0);
        assert_eq!(t.recipients_of(live_id).count(), 0);
        assert_eq!(t.links.len(), 1);
    }

    #[test]
    fn test_record_delivery_and_next_queued() {
        let store = ManagementStore::new();
        let c = campaign(CampaignStatus::Sending);
        let cid = c.id;
        store.write(|t| {
            t.campaigns.insert(cid, c);
            t.replace_recipients(
                cid,
                vec![spec("a@x.com", Uuid::new_v4()), spec("b@x.com", Uuid::new_v4())],
            );
        });

        let queued = store.next_queued(10);
        assert_eq!(queued.len(), 2);

        let failed = store
            .record_delivery(queued[0].id, RecipientStatus::Failed, Some("timeout".into()))
            .unwrap();
        assert_eq!(failed.retry_count, 1);
        assert_eq!(failed.last_error.as_deref(), Some("timeout"));
        assert_eq!(store.next_queued(10).len(), 1);

        assert!(matches!(
            store.record_delivery(Uuid::new_v4(), RecipientStatus::Sent, None),
            Err(MailerError::NotFound(_))
        ));
    }
}
