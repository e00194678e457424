//! Bulk-mailer backend: campaign lifecycle, approvals, audiences, sending
//! accounts and reports, plus the REST surface over them.
//!
//! State is held in memory: relational rows in one locked arena, reference
//! registries in DashMap.

pub mod accounts;
pub mod approval;
pub mod attachments;
pub mod audiences;
pub mod dispatch;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod reports;
pub mod router;
pub mod state;
pub mod store;

pub use accounts::AccountService;
pub use approval::ApprovalGate;
pub use attachments::{AttachmentStorage, AttachmentUpload, FsAttachmentStorage};
pub use audiences::AudienceService;
pub use dispatch::{LoggingDispatcher, MailTestDispatcher};
pub use handlers::ManagementState;
pub use lifecycle::CampaignLifecycleManager;
pub use policy::{PolicySettings, PolicyStore};
pub use reports::ReportService;
pub use router::management_router;
pub use store::ManagementStore;
