//! Audience resolution: previews and full expansion into recipients.

use mailer_core::MailerResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::directory::{Employee, EmployeeDirectory};
use crate::predicates::EmployeePredicate;
use crate::rules::{Audience, AudienceRule};

pub const PREVIEW_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudiencePreview {
    pub count: u64,
    pub sample: Vec<Employee>,
}

/// A recipient to be materialised for a campaign. `email` is lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSpec {
    pub email: String,
    pub full_name: String,
    pub audience_id: Uuid,
}

/// How many employees an audience matched and how many of those were new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceCount {
    pub audience_id: Uuid,
    pub matched: usize,
    pub added: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expansion {
    pub recipients: Vec<RecipientSpec>,
    /// Number of unique emails added across the whole call.
    pub total: usize,
    pub per_audience: Vec<AudienceCount>,
}

pub struct AudienceResolver {
    directory: Arc<dyn EmployeeDirectory>,
}

impl AudienceResolver {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }

    pub fn to_predicate(&self, rules: &[AudienceRule]) -> MailerResult<EmployeePredicate> {
        EmployeePredicate::from_rules(rules)
    }

    /// Count of matching employees plus the first few in directory order.
    pub fn preview(&self, audience: &Audience) -> MailerResult<AudiencePreview> {
        let predicate = self.to_predicate(&audience.rules)?;
        Ok(AudiencePreview {
            count: self.directory.count(&predicate),
            sample: self.directory.query(&predicate, PREVIEW_SAMPLE_SIZE, 0),
        })
    }

    /// Expand audiences, in the given order, into recipients deduplicated by
    /// lower-cased email across the whole call. The first audience to match
    /// an email owns it. All rules are compiled before any directory query.
    pub fn expand(&self, audiences: &[&Audience]) -> MailerResult<Expansion> {
        let compiled = audiences
            .iter()
            .map(|a| Ok((a.id, self.to_predicate(&a.rules)?)))
            .collect::<MailerResult<Vec<_>>>()?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut expansion = Expansion::default();

        for (audience_id, predicate) in compiled {
            let employees = self.directory.query_all(&predicate);
            let mut added = 0;
            for employee in &employees {
                let email = employee.email.trim().to_lowercase();
                if seen.insert(email.clone()) {
                    expansion.recipients.push(RecipientSpec {
                        email,
                        full_name: employee.full_name.clone(),
                        audience_id,
                    });
                    added += 1;
                }
            }
            debug!(
                audience_id = %audience_id,
                matched = employees.len(),
                added,
                "Audience expanded"
            );
            expansion.per_audience.push(AudienceCount {
                audience_id,
                matched: employees.len(),
                added,
            });
        }

        expansion.total = expansion.recipients.len();
        Ok(expansion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{EmployeeStatus, InMemoryDirectory};
    use chrono::Utc;
    use mailer_core::MailerError;

    fn employee(email: &str, department: &str, title: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: email.split('@').next().unwrap_or_default().into(),
            title: Some(title.into()),
            status: EmployeeStatus::Active,
            department: Some(department.into()),
            location: Some("Austin".into()),
        }
    }

    fn audience(name: &str, rules: Vec<AudienceRule>) -> Audience {
        Audience {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            rules,
            created_by: "hr@corp.example.com".into(),
            created_at: Utc::now(),
        }
    }

    fn resolver() -> AudienceResolver {
        let mut employees = vec![
            employee("E1@x.com", "Engineering", "Engineer"),
            employee("e2@x.com", "Engineering", "Engineering Manager"),
            employee("e3@x.com", "Finance", "Analyst"),
        ];
        for i in 0..12 {
            employees.push(employee(&format!("ops{}@x.com", i), "Operations", "Technician"));
        }
        AudienceResolver::new(Arc::new(InMemoryDirectory::new(employees)))
    }

    #[test]
    fn test_preview_caps_sample() {
        let resolver = resolver();
        let ops = audience("Ops", vec![AudienceRule::department("operations")]);
        let preview = resolver.preview(&ops).unwrap();
        assert_eq!(preview.count, 12);
        assert_eq!(preview.sample.len(), PREVIEW_SAMPLE_SIZE);
        assert_eq!(preview.sample[0].email, "ops0@x.com");
    }

    #[test]
    fn test_first_audience_wins_duplicates() {
        let resolver = resolver();
        let engineers = audience("Engineers", vec![AudienceRule::title_contains("engineer")]);
        let eng_dept = audience("Eng dept", vec![AudienceRule::department("Engineering")]);

        let expansion = resolver.expand(&[&engineers, &eng_dept]).unwrap();
        assert_eq!(expansion.total, 2);
        assert!(expansion.recipients.iter().all(|r| r.audience_id == engineers.id));
        assert_eq!(expansion.recipients[0].email, "e1@x.com");
        assert_eq!(
            expansion.per_audience[1],
            AudienceCount {
                audience_id: eng_dept.id,
                matched: 2,
                added: 0
            }
        );
    }

    #[test]
    fn test_repeated_audience_adds_nothing() {
        let resolver = resolver();
        let finance = audience("Finance", vec![AudienceRule::department("finance")]);
        let expansion = resolver.expand(&[&finance, &finance]).unwrap();
        assert_eq!(expansion.total, 1);
        assert_eq!(expansion.per_audience.len(), 2);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let resolver = resolver();
        let everyone = audience("All", vec![]);
        let a = resolver.expand(&[&everyone]).unwrap();
        let b = resolver.expand(&[&everyone]).unwrap();
        assert_eq!(a.total, 15);
        assert_eq!(a.recipients, b.recipients);
    }

    #[test]
    fn test_invalid_rule_fails_before_querying() {
        let resolver = resolver();
        let good = audience("Finance", vec![AudienceRule::department("finance")]);
        let bad = audience("Bad", vec![AudienceRule::status("unknown")]);
        let err = resolver.expand(&[&good, &bad]).unwrap_err();
        assert!(matches!(err, MailerError::InvalidRule(_)));
    }
}
