//! Per-campaign delivery reports.

use mailer_core::{MailerError, MailerResult, RecipientStatus};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{CampaignRecipient, ReportSummary};
use crate::store::ManagementStore;

pub struct ReportService {
    store: Arc<ManagementStore>,
}

impl ReportService {
    pub fn new(store: Arc<ManagementStore>) -> Self {
        Self { store }
    }

    /// Recipient rows, most recently updated first.
    pub fn recipients(&self, campaign_id: Uuid) -> MailerResult<Vec<CampaignRecipient>> {
        let mut rows = self.store.read(|t| {
            t.campaign(campaign_id)?;
            Ok::<_, MailerError>(t.recipients_of(campaign_id).cloned().collect::<Vec<_>>())
        })?;
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    pub fn summary(&self, campaign_id: Uuid) -> MailerResult<ReportSummary> {
        self.store.read(|t| {
            t.campaign(campaign_id)?;
            let mut summary = ReportSummary {
                campaign_id,
                ..Default::default()
            };
            for r in t.recipients_of(campaign_id) {
                summary.total += 1;
                match r.status {
                    RecipientStatus::Queued => summary.queued += 1,
                    RecipientStatus::Sending => summary.sending += 1,
                    RecipientStatus::Sent => summary.sent += 1,
                    RecipientStatus::Failed => summary.failed += 1,
                    RecipientStatus::Bounced => summary.bounced += 1,
                }
            }
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Campaign;
    use chrono::Utc;
    use mailer_audience::RecipientSpec;
    use mailer_core::{CampaignCategory, CampaignStatus};

    fn seeded() -> (ReportService, Uuid, Arc<ManagementStore>) {
        let store = Arc::new(ManagementStore::new());
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            title: "Security training".into(),
            subject: "Complete your training".into(),
            html_body: String::new(),
            text_body: None,
            category: CampaignCategory::OrgWide,
            sender_identity_id: Uuid::new_v4(),
            smtp_account_id: Uuid::new_v4(),
            status: CampaignStatus::Sending,
            scheduled_at: None,
            send_window_start: None,
            send_window_end: None,
            emergency_bypass: false,
            emergency_reason: None,
            attachments: Vec::new(),
            created_by: "it@corp.example.com".into(),
            created_at: now,
            updated_at: now,
        };
        let id = campaign.id;
        let audience_id = Uuid::new_v4();
        store.write(|t| {
            t.campaigns.insert(id, campaign);
            t.replace_recipients(
                id,
                ["a", "b", "c"]
                    .iter()
                    .map(|n| RecipientSpec {
                        email: format!("{}@corp.example.com", n),
                        full_name: n.to_string(),
                        audience_id,
                    })
                    .collect(),
            );
        });
        (ReportService::new(store.clone()), id, store)
    }

    #[test]
    fn test_summary_counts_by_status() {
        let (reports, id, store) = seeded();
        let first = reports.recipients(id).unwrap()[0].id;
        store
            .record_delivery(first, RecipientStatus::Sent, None)
            .unwrap();

        let summary = reports.summary(id).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.queued, 2);

        let rows = reports.recipients(id).unwrap();
        assert_eq!(rows[0].id, first);
    }

    #[test]
    fn test_unknown_campaign() {
        let (reports, _, _) = seeded();
        assert!(matches!(reports.summary(Uuid::new_v4()), Err(MailerError::NotFound(_))));
    }
}
