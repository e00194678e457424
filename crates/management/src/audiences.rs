//! Audience management. Audiences linked to an active campaign are frozen.

use chrono::Utc;
use mailer_audience::{Audience, AudiencePreview, AudienceResolver};
use mailer_core::audit::{noop_sink, AuditEntry, AuditSink};
use mailer_core::{Actor, MailerError, MailerResult};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::AudienceRequest;
use crate::store::{ManagementStore, Tables};

pub struct AudienceService {
    store: Arc<ManagementStore>,
    resolver: Arc<AudienceResolver>,
    audit: Arc<dyn AuditSink>,
}

impl AudienceService {
    pub fn new(store: Arc<ManagementStore>, resolver: Arc<AudienceResolver>) -> Self {
        Self {
            store,
            resolver,
            audit: noop_sink(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn create(&self, req: AudienceRequest, actor: &Actor) -> MailerResult<Audience> {
        self.validate(&req)?;
        let audience = Audience {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            description: req.description,
            rules: req.rules,
            created_by: actor.email.clone(),
            created_at: Utc::now(),
        };
        self.store
            .write(|t| t.audiences.insert(audience.id, audience.clone()));

        info!(audience_id = %audience.id, rules = audience.rules.len(), "Audience created");
        metrics::counter!("audiences.created").increment(1);
        self.record("AUDIENCE_CREATE", &audience, actor);
        Ok(audience)
    }

    /// Replace name, description and rules.
    pub fn update(&self, id: Uuid, req: AudienceRequest, actor: &Actor) -> MailerResult<Audience> {
        self.validate(&req)?;
        let audience = self.store.write(|t| {
            ensure_not_linked(t, id)?;
            let audience = t
                .audiences
                .get_mut(&id)
                .ok_or_else(|| MailerError::not_found(format!("Audience {}", id)))?;
            audience.name = req.name.trim().to_string();
            audience.description = req.description;
            audience.rules = req.rules;
            Ok::<_, MailerError>(audience.clone())
        })?;

        info!(audience_id = %id, "Audience updated");
        metrics::counter!("audiences.updated").increment(1);
        self.record("AUDIENCE_UPDATE", &audience, actor);
        Ok(audience)
    }

    /// Remove an audience and any links from inactive campaigns.
    pub fn delete(&self, id: Uuid, actor: &Actor) -> MailerResult<()> {
        let audience = self.store.write(|t| {
            ensure_not_linked(t, id)?;
            let audience = t
                .audiences
                .remove(&id)
                .ok_or_else(|| MailerError::not_found(format!("Audience {}", id)))?;
            t.links.retain(|l| l.audience_id != id);
            Ok::<_, MailerError>(audience)
        })?;

        info!(audience_id = %id, "Audience deleted");
        metrics::counter!("audiences.deleted").increment(1);
        self.record("AUDIENCE_DELETE", &audience, actor);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> MailerResult<Audience> {
        self.store.read(|t| t.audience(id).cloned())
    }

    /// All audiences, oldest first.
    pub fn list(&self) -> Vec<Audience> {
        let mut audiences: Vec<Audience> =
            self.store.read(|t| t.audiences.values().cloned().collect());
        audiences.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        audiences
    }

    pub fn preview(&self, id: Uuid) -> MailerResult<AudiencePreview> {
        let audience = self.get(id)?;
        self.resolver.preview(&audience)
    }

    fn validate(&self, req: &AudienceRequest) -> MailerResult<()> {
        if req.name.trim().is_empty() {
            return Err(MailerError::InvalidRequest("audience name is required".into()));
        }
        self.resolver.to_predicate(&req.rules)?;
        Ok(())
    }

    fn record(&self, action: &str, audience: &Audience, actor: &Actor) {
        self.audit.record(AuditEntry::new(
            action,
            "audience",
            audience.id,
            actor,
            json!({ "name": audience.name, "rules": audience.rules }),
        ));
    }
}

fn ensure_not_linked(t: &Tables, audience_id: Uuid) -> MailerResult<()> {
    let active = t.active_links_for_audience(audience_id);
    if active > 0 {
        return Err(MailerError::InUse(format!(
            "audience {} is linked to {} active campaign(s)",
            audience_id, active
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailer_audience::{AudienceRule, Employee, EmployeeStatus, InMemoryDirectory};
    use mailer_core::audit::capture_sink;

    fn service() -> AudienceService {
        let directory = InMemoryDirectory::new(vec![Employee {
            id: Uuid::new_v4(),
            email: "pat@corp.example.com".into(),
            full_name: "Pat Lee".into(),
            title: Some("Counsel".into()),
            status: EmployeeStatus::Active,
            department: Some("Legal".into()),
            location: Some("Dublin".into()),
        }]);
        AudienceService::new(
            Arc::new(ManagementStore::new()),
            Arc::new(AudienceResolver::new(Arc::new(directory))),
        )
    }

    fn request(rules: Vec<AudienceRule>) -> AudienceRequest {
        AudienceRequest {
            name: "Legal team".into(),
            description: Some("Everyone in legal".into()),
            rules,
        }
    }

    fn actor() -> Actor {
        Actor::new("hr@corp.example.com")
    }

    #[test]
    fn test_create_and_preview() {
        let audit = capture_sink();
        let svc = service().with_audit(audit.clone());
        let audience = svc
            .create(request(vec![AudienceRule::department("legal")]), &actor())
            .unwrap();
        let preview = svc.preview(audience.id).unwrap();
        assert_eq!(preview.count, 1);
        assert_eq!(preview.sample[0].email, "pat@corp.example.com");
        assert_eq!(audit.count_action("AUDIENCE_CREATE"), 1);
        assert_eq!(svc.list().len(), 1);
    }

    #[test]
    fn test_invalid_rules_rejected_up_front() {
        let svc = service();
        let err = svc
            .create(request(vec![AudienceRule::status("retired")]), &actor())
            .unwrap_err();
        assert!(matches!(err, MailerError::InvalidRule(_)));
        assert!(svc.list().is_empty());

        let mut blank = request(Vec::new());
        blank.name = "  ".into();
        assert!(matches!(svc.create(blank, &actor()), Err(MailerError::InvalidRequest(_))));
    }

    #[test]
    fn test_unknown_audience_is_not_found() {
        let svc = service();
        assert!(matches!(svc.preview(Uuid::new_v4()), Err(MailerError::NotFound(_))));
        assert!(matches!(
            svc.update(Uuid::new_v4(), request(Vec::new()), &actor()),
            Err(MailerError::NotFound(_))
        ));
        assert!(matches!(svc.delete(Uuid::new_v4(), &actor()), Err(MailerError::NotFound(_))));
    }

    #[test]
    fn test_update_replaces_rules() {
        let svc = service();
        let audience = svc
            .create(request(vec![AudienceRule::department("legal")]), &actor())
            .unwrap();
        let updated = svc
            .update(audience.id, request(vec![AudienceRule::location("Paris")]), &actor())
            .unwrap();
        assert_eq!(updated.rules, vec![AudienceRule::location("Paris")]);
        assert_eq!(svc.preview(audience.id).unwrap().count, 0);
    }
}
