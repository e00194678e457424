//! Audit trail: trait for recording who did what to which entity.
//!
//! Services accept an `Arc<dyn AuditSink>`. Recording is fire-and-forget:
//! sinks swallow their own failures so a broken audit backend never fails
//! the operation being audited.

use crate::types::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_email: String,
    pub actor_ip: Option<String>,
    pub actor_user_agent: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        actor: &Actor,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            actor_email: actor.email.clone(),
            actor_ip: actor.ip.clone(),
            actor_user_agent: actor.user_agent.clone(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// No-op sink for modules that don't audit.
pub struct NoOpAudit;

impl AuditSink for NoOpAudit {
    fn record(&self, _entry: AuditEntry) {}
}

/// Writes audit entries to the structured log under the `audit` target.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        info!(
            target: "audit",
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            actor = %entry.actor_email,
            ip = entry.actor_ip.as_deref().unwrap_or("-"),
            payload = %entry.payload,
            "audit"
        );
    }
}

/// In-memory sink that captures entries for testing.
#[derive(Default)]
pub struct CaptureAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl CaptureAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.entries().iter().filter(|e| e.action == action).count()
    }
}

impl AuditSink for CaptureAudit {
    fn record(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

pub fn noop_sink() -> Arc<dyn AuditSink> {
    Arc::new(NoOpAudit)
}

pub fn capture_sink() -> Arc<CaptureAudit> {
    Arc::new(CaptureAudit::new())
}
