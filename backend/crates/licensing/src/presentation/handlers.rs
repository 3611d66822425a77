//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::application::config::LicensingConfig;
use crate::application::{
    HeartbeatUseCase, IssueInput, IssueUseCase, ListUseCase, RevokeUseCase, UpdateInput,
    UpdateUseCase, ValidateInput, ValidateUseCase,
};
use crate::domain::repository::LicenseRepository;
use crate::error::LicenseResult;
use crate::presentation::dto::{
    IssueRequest, LicenseFileResponse, LicenseKeyRequest, ListLicensesResponse, OkResponse,
    UpdateLicenseRequest, ValidateRequest, ValidateResponse,
};

/// Shared state for licensing handlers
#[derive(Clone)]
pub struct LicenseAppState<R>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<LicensingConfig>,
}

// ============================================================================
// Issue
// ============================================================================

/// POST /issue
pub async fn issue<R>(
    State(state): State<LicenseAppState<R>>,
    Json(req): Json<IssueRequest>,
) -> LicenseResult<Json<LicenseFileResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    let use_case = IssueUseCase::new(state.repo.clone(), state.config.clone());

    let artifact = use_case
        .execute(IssueInput {
            customer: req.customer,
            machine_id: req.machine_id,
            expires_at: req.expires_at,
            features: req.features,
        })
        .await?;

    Ok(Json(artifact.into()))
}

// ============================================================================
// Validate
// ============================================================================

/// POST /validate
pub async fn validate<R>(
    State(state): State<LicenseAppState<R>>,
    Json(req): Json<ValidateRequest>,
) -> LicenseResult<Json<ValidateResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    let use_case = ValidateUseCase::new(state.repo.clone());

    let output = use_case
        .execute(ValidateInput {
            license_key: req.license_key,
            machine_id: req.machine_id,
        })
        .await?;

    Ok(Json(output.into()))
}

// ============================================================================
// Revoke
// ============================================================================

/// POST /revoke
pub async fn revoke<R>(
    State(state): State<LicenseAppState<R>>,
    Json(req): Json<LicenseKeyRequest>,
) -> LicenseResult<Json<OkResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    RevokeUseCase::new(state.repo.clone())
        .execute(&req.license_key)
        .await?;

    Ok(Json(OkResponse::ok()))
}

// ============================================================================
// Heartbeat
// ============================================================================

/// POST /heartbeat
pub async fn heartbeat<R>(
    State(state): State<LicenseAppState<R>>,
    Json(req): Json<LicenseKeyRequest>,
) -> LicenseResult<Json<OkResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    HeartbeatUseCase::new(state.repo.clone())
        .execute(&req.license_key)
        .await?;

    Ok(Json(OkResponse::ok()))
}

// ============================================================================
// Update
// ============================================================================

/// POST /update
pub async fn update<R>(
    State(state): State<LicenseAppState<R>>,
    Json(req): Json<UpdateLicenseRequest>,
) -> LicenseResult<Json<OkResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    UpdateUseCase::new(state.repo.clone())
        .execute(UpdateInput {
            license_key: req.license_key,
            expires_at: req.expires_at,
            features: req.features,
        })
        .await?;

    Ok(Json(OkResponse::ok()))
}

// ============================================================================
// List
// ============================================================================

/// GET / (collection root)
pub async fn list<R>(
    State(state): State<LicenseAppState<R>>,
) -> LicenseResult<Json<ListLicensesResponse>>
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    let licenses = ListUseCase::new(state.repo.clone()).execute().await?;

    Ok(Json(ListLicensesResponse {
        licenses: licenses.into_iter().map(Into::into).collect(),
    }))
}
