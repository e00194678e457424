pub mod audit;
pub mod config;
pub mod error;
pub mod types;

pub use audit::{AuditEntry, AuditSink};
pub use config::AppConfig;
pub use error::{MailerError, MailerResult};
pub use types::{Actor, CampaignCategory, CampaignStatus, RecipientStatus, Role};
