//! Test-send dispatch contract.
//!
//! Actual SMTP delivery lives outside this crate. The lifecycle manager only
//! needs a synchronous "send these test copies and tell me what failed".

use std::sync::Mutex;
use tracing::info;

use crate::models::Campaign;

pub trait MailTestDispatcher: Send + Sync {
    /// Returns one failure message per recipient that could not be sent.
    /// Empty means every recipient was sent.
    fn send_test(&self, campaign: &Campaign, recipients: &[String]) -> Vec<String>;
}

/// Logs the send instead of delivering. Used until a transport is wired in.
pub struct LoggingDispatcher;

impl MailTestDispatcher for LoggingDispatcher {
    fn send_test(&self, campaign: &Campaign, recipients: &[String]) -> Vec<String> {
        info!(
            campaign_id = %campaign.id,
            subject = %campaign.subject,
            recipients = recipients.len(),
            "Test send dispatched"
        );
        Vec::new()
    }
}

/// Records every call and fails the recipients listed in `failing`.
#[derive(Default)]
pub struct ScriptedDispatcher {
    failing: Vec<String>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedDispatcher {
    pub fn failing(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_lowercase()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl MailTestDispatcher for ScriptedDispatcher {
    fn send_test(&self, _campaign: &Campaign, recipients: &[String]) -> Vec<String> {
        let mut failures = Vec::new();
        for r in recipients {
            if self.failing.contains(&r.to_lowercase()) {
                failures.push(format!("{}: mailbox unavailable", r));
            } else if let Ok(mut sent) = self.sent.lock() {
                sent.push(r.clone());
            }
        }
        failures
    }
}
