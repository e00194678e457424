//! Compiled audience predicates.

use mailer_core::MailerResult;

use crate::directory::{Employee, EmployeeStatus};
use crate::rules::{AudienceRule, RuleType};

/// A single normalised comparison. Textual values are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    DepartmentIs(String),
    LocationIs(String),
    TitleContains(String),
    StatusIs(EmployeeStatus),
}

/// Conjunction of clauses over an employee record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeePredicate {
    clauses: Vec<Clause>,
}

impl EmployeePredicate {
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Compile audience rules. Fails with `InvalidRule` on a status value
    /// that is not a known employee status.
    pub fn from_rules(rules: &[AudienceRule]) -> MailerResult<Self> {
        let clauses = rules
            .iter()
            .map(|rule| {
                let value = rule.rule_value.trim();
                Ok(match rule.rule_type {
                    RuleType::Department => Clause::DepartmentIs(value.to_lowercase()),
                    RuleType::Location => Clause::LocationIs(value.to_lowercase()),
                    RuleType::TitleContains => Clause::TitleContains(value.to_lowercase()),
                    RuleType::Status => Clause::StatusIs(value.parse()?),
                })
            })
            .collect::<MailerResult<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::DepartmentIs(name) => equals_ignore_case(employee.department.as_deref(), name),
            Clause::LocationIs(name) => equals_ignore_case(employee.location.as_deref(), name),
            Clause::TitleContains(fragment) => employee
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(fragment.as_str())),
            Clause::StatusIs(status) => employee.status == *status,
        })
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

// Employees without the attribute never match.
fn equals_ignore_case(actual: Option<&str>, expected_lower: &str) -> bool {
    actual.is_some_and(|a| a.to_lowercase() == expected_lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailer_core::MailerError;
    use uuid::Uuid;

    fn engineer() -> Employee {
        Employee {
            id: Uuid::new_v4(),
            email: "dana@corp.example.com".into(),
            full_name: "Dana Reyes".into(),
            title: Some("Senior Software Engineer".into()),
            status: EmployeeStatus::Active,
            department: Some("Engineering".into()),
            location: Some("Lisbon".into()),
        }
    }

    #[test]
    fn test_conjunction_is_case_insensitive() {
        let predicate = EmployeePredicate::from_rules(&[
            AudienceRule::department("ENGINEERING"),
            AudienceRule::location("lisbon"),
            AudienceRule::title_contains("software"),
            AudienceRule::status("active"),
        ])
        .unwrap();
        assert_eq!(predicate.len(), 4);
        assert!(predicate.matches(&engineer()));
    }

    #[test]
    fn test_any_failing_clause_rejects() {
        let predicate = EmployeePredicate::from_rules(&[
            AudienceRule::department("Engineering"),
            AudienceRule::location("Berlin"),
        ])
        .unwrap();
        assert!(!predicate.matches(&engineer()));
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        let mut e = engineer();
        e.title = None;
        e.department = None;
        let by_title = EmployeePredicate::from_rules(&[AudienceRule::title_contains("")]).unwrap();
        let by_dept =
            EmployeePredicate::from_rules(&[AudienceRule::department("Engineering")]).unwrap();
        assert!(!by_title.matches(&e));
        assert!(!by_dept.matches(&e));
    }

    #[test]
    fn test_empty_rules_match_everyone() {
        assert!(EmployeePredicate::from_rules(&[]).unwrap().matches(&engineer()));
    }

    #[test]
    fn test_unknown_status_is_invalid_rule() {
        let err = EmployeePredicate::from_rules(&[AudienceRule::status("sabbatical")]).unwrap_err();
        assert!(matches!(err, MailerError::InvalidRule(_)));
    }
}
