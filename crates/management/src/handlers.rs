//! Axum REST handlers for the mailer API.

use crate::accounts::AccountService;
use crate::attachments::{AttachmentUpload, FsAttachmentStorage};
use crate::audiences::AudienceService;
use crate::dispatch::LoggingDispatcher;
use crate::lifecycle::CampaignLifecycleManager;
use crate::models::*;
use crate::policy::{PolicySettings, PolicySettingsRequest, PolicyStore};
use crate::reports::ReportService;
use crate::store::ManagementStore;
use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use mailer_audience::{Audience, AudiencePreview, AudienceResolver, EmployeeDirectory};
use mailer_core::audit::AuditSink;
use mailer_core::{Actor, AppConfig, CampaignStatus, MailerError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Shared API state.
#[derive(Clone)]
pub struct ManagementState {
    pub lifecycle: Arc<CampaignLifecycleManager>,
    pub audiences: Arc<AudienceService>,
    pub accounts: Arc<AccountService>,
    pub reports: Arc<ReportService>,
    pub policy: Arc<PolicyStore>,
}

impl ManagementState {
    /// Wire every service over one store, policy and directory.
    pub fn new(
        config: &AppConfig,
        directory: Arc<dyn EmployeeDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let store = Arc::new(ManagementStore::new());
        let policy = Arc::new(PolicyStore::new(&config.policy).with_audit(audit.clone()));
        let resolver = Arc::new(AudienceResolver::new(directory));

        let lifecycle = CampaignLifecycleManager::new(store.clone(), policy.clone(), resolver.clone())
            .with_dispatcher(Arc::new(LoggingDispatcher))
            .with_storage(Arc::new(FsAttachmentStorage::new(&config.attachments.path)))
            .with_internal_domains(config.sending.internal_domains.clone())
            .with_audit(audit.clone());

        Self {
            lifecycle: Arc::new(lifecycle),
            audiences: Arc::new(AudienceService::new(store.clone(), resolver).with_audit(audit.clone())),
            accounts: Arc::new(AccountService::new(store.clone(), policy.clone()).with_audit(audit)),
            reports: Arc::new(ReportService::new(store)),
            policy,
        }
    }
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// `MailerError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MailerError);

impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &MailerError) -> StatusCode {
    match err {
        MailerError::NotFound(_) => StatusCode::NOT_FOUND,
        MailerError::InvalidState { .. } | MailerError::InUse(_) => StatusCode::CONFLICT,
        MailerError::ReservedAccountConflict(_)
        | MailerError::InvalidPolicy(_)
        | MailerError::InvalidRule(_)
        | MailerError::MissingReason => StatusCode::UNPROCESSABLE_ENTITY,
        MailerError::TooManyRecipients { .. }
        | MailerError::DomainNotAllowed(_)
        | MailerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        MailerError::Forbidden(_) => StatusCode::FORBIDDEN,
        MailerError::DispatchFailed(_) => StatusCode::BAD_GATEWAY,
        MailerError::StorageError(_)
        | MailerError::Serialization(_)
        | MailerError::Io(_)
        | MailerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if self.0.is_internal() {
            error!(error = %self.0, "Request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        metrics::counter!("api.errors", "code" => self.0.code()).increment(1);
        (
            status,
            Json(ErrorResponse {
                error: self.0.code().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ─── Actor ─────────────────────────────────────────────────────────────────

pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Caller identity as asserted by the authenticating proxy.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(actor_from_headers(&parts.headers)?))
    }
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, MailerError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let email = header(ACTOR_EMAIL_HEADER)
        .ok_or_else(|| MailerError::Forbidden("missing actor identity".into()))?;
    let roles = header(ACTOR_ROLES_HEADER)
        .map(|raw| {
            raw.split(',')
                .map(|r| r.trim().to_uppercase())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();
    // First hop of X-Forwarded-For is the client.
    let ip = header(FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    Ok(Actor {
        email: email.to_lowercase(),
        roles,
        ip,
        user_agent: header(USER_AGENT.as_str()).map(str::to_string),
    })
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<CampaignStatus>,
}

pub async fn list_campaigns(
    State(state): State<ManagementState>,
    Query(query): Query<ListCampaignsQuery>,
) -> Json<Vec<Campaign>> {
    Json(state.lifecycle.list(query.status))
}

pub async fn get_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.get(id)?))
}

pub async fn create_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<CreateCampaignRequest>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.lifecycle.create(req, &actor)?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn update_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCampaignRequest>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.update(id, req, &actor)?))
}

pub async fn delete_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.lifecycle.delete(id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitCampaignRequest>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.submit(id, req, &actor)?))
}

pub async fn schedule_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleCampaignRequest>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.schedule(id, req, &actor)?))
}

pub async fn expand_recipients(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<ExpandRecipientsRequest>,
) -> ApiResult<Json<ExpansionReport>> {
    Ok(Json(
        state
            .lifecycle
            .expand_recipients(id, &req.audience_ids, &actor)?,
    ))
}

pub async fn queue_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.queue_recipients(id, &actor)?))
}

pub async fn requeue_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.requeue(id, &actor)?))
}

pub async fn test_send(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<TestSendRequest>,
) -> ApiResult<StatusCode> {
    state.lifecycle.test_send(id, &req.recipients, &actor)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn cancel_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.cancel(id, &actor)?))
}

pub async fn complete_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.lifecycle.complete(id, &actor)?))
}

pub async fn duplicate_campaign(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let copy = state.lifecycle.duplicate(id, &actor)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

#[derive(Debug, Deserialize)]
pub struct AttachmentQuery {
    pub file_name: String,
}

/// Raw file body; the original name travels in `?file_name=`.
pub async fn add_attachment(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Query(query): Query<AttachmentQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Campaign>> {
    let upload = AttachmentUpload {
        file_name: query.file_name,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        bytes: body.to_vec(),
    };
    // File writes are blocking.
    let lifecycle = state.lifecycle.clone();
    let campaign = tokio::task::spawn_blocking(move || lifecycle.add_attachment(id, upload, &actor))
        .await
        .map_err(|e| MailerError::StorageError(format!("attachment task failed: {}", e)))??;
    Ok(Json(campaign))
}

pub async fn campaign_approvals(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Approval>>> {
    Ok(Json(state.lifecycle.approvals(id)?))
}

pub async fn decide_approval(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<ApprovalDecisionRequest>,
) -> ApiResult<Json<Approval>> {
    Ok(Json(
        state
            .lifecycle
            .decide(id, &actor, req.approved, req.comment)?,
    ))
}

// ─── Audiences ─────────────────────────────────────────────────────────────

pub async fn list_audiences(State(state): State<ManagementState>) -> Json<Vec<Audience>> {
    Json(state.audiences.list())
}

pub async fn create_audience(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<AudienceRequest>,
) -> ApiResult<(StatusCode, Json<Audience>)> {
    let audience = state.audiences.create(req, &actor)?;
    Ok((StatusCode::CREATED, Json(audience)))
}

pub async fn update_audience(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<AudienceRequest>,
) -> ApiResult<Json<Audience>> {
    Ok(Json(state.audiences.update(id, req, &actor)?))
}

pub async fn delete_audience(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.audiences.delete(id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn preview_audience(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AudiencePreview>> {
    Ok(Json(state.audiences.preview(id)?))
}

// ─── Admin ─────────────────────────────────────────────────────────────────

pub async fn list_smtp_accounts(State(state): State<ManagementState>) -> Json<Vec<SmtpAccount>> {
    Json(state.accounts.list_smtp_accounts())
}

pub async fn create_smtp_account(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<SmtpAccountRequest>,
) -> ApiResult<(StatusCode, Json<SmtpAccount>)> {
    let account = state.accounts.create_smtp_account(req, &actor)?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_smtp_account(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<SmtpAccountRequest>,
) -> ApiResult<Json<SmtpAccount>> {
    Ok(Json(state.accounts.update_smtp_account(id, req, &actor)?))
}

pub async fn delete_smtp_account(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.accounts.delete_smtp_account(id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_sender_identities(
    State(state): State<ManagementState>,
) -> Json<Vec<SenderIdentity>> {
    Json(state.accounts.list_sender_identities())
}

pub async fn create_sender_identity(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<SenderIdentityRequest>,
) -> ApiResult<(StatusCode, Json<SenderIdentity>)> {
    let identity = state.accounts.create_sender_identity(req, &actor)?;
    Ok((StatusCode::CREATED, Json(identity)))
}

pub async fn update_sender_identity(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<SenderIdentityRequest>,
) -> ApiResult<Json<SenderIdentity>> {
    Ok(Json(state.accounts.update_sender_identity(id, req, &actor)?))
}

pub async fn delete_sender_identity(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.accounts.delete_sender_identity(id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_policies(State(state): State<ManagementState>) -> Json<PolicySettings> {
    Json(state.policy.get())
}

pub async fn update_policies(
    State(state): State<ManagementState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<PolicySettingsRequest>,
) -> ApiResult<Json<PolicySettings>> {
    Ok(Json(state.policy.update(req, &actor)?))
}

// ─── Reports ───────────────────────────────────────────────────────────────

pub async fn report_summary(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReportSummary>> {
    Ok(Json(state.reports.summary(id)?))
}

pub async fn report_recipients(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<CampaignRecipient>>> {
    Ok(Json(state.reports.recipients(id)?))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
