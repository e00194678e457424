//! Audience targeting: typed rules over the employee directory, compiled
//! into predicates and expanded into deduplicated recipient lists.

pub mod directory;
pub mod predicates;
pub mod resolver;
pub mod rules;

pub use directory::{Employee, EmployeeDirectory, EmployeeStatus, InMemoryDirectory};
pub use predicates::EmployeePredicate;
pub use resolver::{AudienceCount, AudiencePreview, AudienceResolver, Expansion, RecipientSpec};
pub use rules::{Audience, AudienceRule, RuleType};
