//! Employee directory contract and an in-memory implementation.

use mailer_core::{MailerError, MailerResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::predicates::EmployeePredicate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub status: EmployeeStatus,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

impl FromStr for EmployeeStatus {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(EmployeeStatus::Active),
            "INACTIVE" => Ok(EmployeeStatus::Inactive),
            "ON_LEAVE" => Ok(EmployeeStatus::OnLeave),
            "TERMINATED" => Ok(EmployeeStatus::Terminated),
            other => Err(MailerError::InvalidRule(format!(
                "unknown employee status '{}'",
                other
            ))),
        }
    }
}

/// Predicate evaluator over the employee directory. Implementations must
/// return results in a stable natural order.
pub trait EmployeeDirectory: Send + Sync {
    fn count(&self, predicate: &EmployeePredicate) -> u64;

    fn query(&self, predicate: &EmployeePredicate, limit: usize, offset: usize) -> Vec<Employee>;

    fn query_all(&self, predicate: &EmployeePredicate) -> Vec<Employee>;
}

/// Directory held in memory, in insertion order.
#[derive(Default)]
pub struct InMemoryDirectory {
    employees: RwLock<Vec<Employee>>,
}

impl InMemoryDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            employees: RwLock::new(employees),
        }
    }

    /// Load a JSON array of employees.
    pub fn from_json_file(path: &str) -> MailerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let employees: Vec<Employee> = serde_json::from_str(&raw)?;
        info!(path, count = employees.len(), "Employee directory loaded");
        Ok(Self::new(employees))
    }

    pub fn insert(&self, employee: Employee) {
        self.employees.write().push(employee);
    }

    pub fn len(&self) -> usize {
        self.employees.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.read().is_empty()
    }
}

impl EmployeeDirectory for InMemoryDirectory {
    fn count(&self, predicate: &EmployeePredicate) -> u64 {
        self.employees
            .read()
            .iter()
            .filter(|e| predicate.matches(e))
            .count() as u64
    }

    fn query(&self, predicate: &EmployeePredicate, limit: usize, offset: usize) -> Vec<Employee> {
        self.employees
            .read()
            .iter()
            .filter(|e| predicate.matches(e))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    fn query_all(&self, predicate: &EmployeePredicate) -> Vec<Employee> {
        self.employees
            .read()
            .iter()
            .filter(|e| predicate.matches(e))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn employee(email: &str, department: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: email.split('@').next().unwrap_or_default().into(),
            title: None,
            status: EmployeeStatus::Active,
            department: Some(department.into()),
            location: None,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("on_leave".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::OnLeave);
        assert_eq!(" Active ".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::Active);
        assert!(matches!(
            "retired".parse::<EmployeeStatus>(),
            Err(MailerError::InvalidRule(_))
        ));
    }

    #[test]
    fn test_query_paging_keeps_insertion_order() {
        let dir = InMemoryDirectory::new(
            (0..5)
                .map(|i| employee(&format!("e{}@corp.example.com", i), "Sales"))
                .collect(),
        );
        let all = EmployeePredicate::match_all();
        assert_eq!(dir.count(&all), 5);

        let page = dir.query(&all, 2, 1);
        let emails: Vec<_> = page.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["e1@corp.example.com", "e2@corp.example.com"]);
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let employees = vec![employee("a@corp.example.com", "HR")];
        write!(file, "{}", serde_json::to_string(&employees).unwrap()).unwrap();

        let dir = InMemoryDirectory::from_json_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(dir.len(), 1);
    }
}
