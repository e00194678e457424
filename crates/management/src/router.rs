//! API router: mounts all mailer endpoints under /api.

use crate::handlers::{self, ManagementState};
use axum::routing::{get, post, put};
use axum::Router;

/// Build the API router. The caller adds tracing and CORS layers.
pub fn management_router(state: ManagementState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Campaigns
        .route("/api/campaigns", get(handlers::list_campaigns).post(handlers::create_campaign))
        .route(
            "/api/campaigns/:id",
            get(handlers::get_campaign)
                .put(handlers::update_campaign)
                .delete(handlers::delete_campaign),
        )
        .route("/api/campaigns/:id/submit", post(handlers::submit_campaign))
        .route("/api/campaigns/:id/schedule", post(handlers::schedule_campaign))
        .route("/api/campaigns/:id/expand", post(handlers::expand_recipients))
        .route("/api/campaigns/:id/queue", post(handlers::queue_campaign))
        .route("/api/campaigns/:id/requeue", post(handlers::requeue_campaign))
        .route("/api/campaigns/:id/test-send", post(handlers::test_send))
        .route("/api/campaigns/:id/cancel", post(handlers::cancel_campaign))
        .route("/api/campaigns/:id/complete", post(handlers::complete_campaign))
        .route("/api/campaigns/:id/duplicate", post(handlers::duplicate_campaign))
        .route("/api/campaigns/:id/attachments", post(handlers::add_attachment))
        .route("/api/campaigns/:id/approvals", get(handlers::campaign_approvals))
        // Approvals
        .route("/api/approvals/:id/decision", post(handlers::decide_approval))
        // Audiences
        .route("/api/audiences", get(handlers::list_audiences).post(handlers::create_audience))
        .route(
            "/api/audiences/:id",
            put(handlers::update_audience).delete(handlers::delete_audience),
        )
        .route("/api/audiences/:id/preview", get(handlers::preview_audience))
        // Admin
        .route(
            "/api/admin/smtp-accounts",
            get(handlers::list_smtp_accounts).post(handlers::create_smtp_account),
        )
        .route(
            "/api/admin/smtp-accounts/:id",
            put(handlers::update_smtp_account).delete(handlers::delete_smtp_account),
        )
        .route(
            "/api/admin/sender-identities",
            get(handlers::list_sender_identities).post(handlers::create_sender_identity),
        )
        .route(
            "/api/admin/sender-identities/:id",
            put(handlers::update_sender_identity).delete(handlers::delete_sender_identity),
        )
        .route(
            "/api/admin/policies",
            get(handlers::get_policies).put(handlers::update_policies),
        )
        // Reports
        .route("/api/reports/campaigns/:id/summary", get(handlers::report_summary))
        .route("/api/reports/campaigns/:id/recipients", get(handlers::report_recipients))
        .with_state(state)
}
