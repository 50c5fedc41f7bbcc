use crate::db;
use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use shield_core::categories::all_tables;
use shield_core::constants::CATEGORY_TABLE_VERSION;
use shield_core::decryption::decrypt_field;
use shield_core::deployment::DeploymentRecord;
use shield_core::submission::{process_assessment, submit_assessment, withdraw_funds};
use shield_core::types::{Address, AssessmentId, StoredField};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/assessments", post(create_assessment))
        .route("/api/v1/assessments/:id/process", post(process))
        .route("/api/v1/assessments/:id/withdraw", post(withdraw))
        .route("/api/v1/assessments/:id/decrypt", post(decrypt))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/categories", get(get_categories))
        .route("/api/v1/form/validate", post(validate_form))
        .route("/api/v1/assessments/:id", get(get_assessment))
        .route("/api/v1/users/:address/assessments", get(get_user_assessments))
        .route("/api/v1/users/:address/profile", get(get_user_profile))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/deployment", get(get_deployment))
        .route("/api/v1/submissions", get(list_submissions))
        .route("/api/v1/decryptions", get(list_decryptions))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == state.config.api_key.as_str() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("unauthorized access attempt");
    Err(StatusCode::UNAUTHORIZED)
}

fn parse_assessment_id(raw: &str) -> Result<AssessmentId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid assessment id '{raw}'")))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid address '{raw}'")))
}

fn page(params: &ListParams) -> (u64, u64) {
    (params.offset.unwrap_or(0), params.limit.unwrap_or(50).min(500))
}

async fn get_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        version: CATEGORY_TABLE_VERSION,
        tables: all_tables().to_vec(),
    })
}

async fn validate_form(Json(req): Json<FormValidateRequest>) -> Result<Json<FormValidateResponse>, ApiError> {
    let missing = req.form.missing_fields(req.step)?;

    Ok(Json(FormValidateResponse {
        step: req.step,
        valid: missing.is_empty(),
        missing: missing.into_iter().map(str::to_string).collect(),
    }))
}

async fn create_assessment(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let _guard = state.try_begin_submission()?;

    req.form.validate_all()?;
    let deposit_eth = req
        .deposit_eth
        .unwrap_or_else(|| state.config.deposit_eth.clone());

    let receipt = submit_assessment(&state.session, state.contract.address, req.form, &deposit_eth).await?;

    // From here on the deposit is on chain: nothing below may turn this into an error.
    let assessment_id = match state.contract.reader.get_user_assessments(receipt.submitter).await {
        Ok(ids) => ids.last().copied(),
        Err(e) => {
            tracing::warn!(error = %e, tx_hash = %receipt.tx_hash, "could not look up new assessment id");
            None
        }
    };

    let receipt_id = Uuid::new_v4();
    let journaled = match db::insert_submission(&state.db, receipt_id, &receipt).await {
        Ok(()) => {
            tracing::info!(%receipt_id, tx_hash = %receipt.tx_hash, "submission recorded");
            true
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                %receipt_id,
                tx_hash = %receipt.tx_hash,
                submitter = %receipt.submitter,
                deposit_wei = %receipt.deposit_wei,
                "submission journal write failed"
            );
            false
        }
    };

    Ok(Json(SubmitResponse {
        receipt_id,
        assessment_id: assessment_id.map(|id| id.to_string()),
        tx_hash: receipt.tx_hash.to_string(),
        deposit_wei: receipt.deposit_wei.to_string(),
        submitter: receipt.submitter.to_string(),
        journaled,
    }))
}

async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let id = parse_assessment_id(&id)?;
    let record = state.contract.reader.get_assessment(id).await?;

    Ok(Json(AssessmentResponse {
        id: record.id.to_string(),
        owner: record.owner.to_string(),
        timestamp: record.timestamp,
        is_processed: record.is_processed,
        is_approved: record.is_approved,
        deposit_wei: record.deposit_amount.to_string(),
    }))
}

async fn process(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let id = parse_assessment_id(&id)?;

    // Surface unknown ids as 404 instead of a reverted transaction.
    state.contract.reader.get_assessment(id).await?;

    let tx_hash = process_assessment(&state.session, state.contract.address, id).await?;

    Ok(Json(ProcessResponse {
        assessment_id: id.to_string(),
        tx_hash: tx_hash.to_string(),
    }))
}

async fn withdraw(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let id = parse_assessment_id(&id)?;

    let record = state.contract.reader.get_assessment(id).await?;
    if record.deposit_amount == 0 {
        return Err(ApiError::Conflict(format!("assessment {id} holds no deposit")));
    }

    let tx_hash = withdraw_funds(&state.session, state.contract.address, id).await?;

    Ok(Json(WithdrawResponse {
        assessment_id: id.to_string(),
        tx_hash: tx_hash.to_string(),
        amount_wei: record.deposit_amount.to_string(),
    }))
}

async fn decrypt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let id = parse_assessment_id(&id)?;
    let field: StoredField = req.field.parse().map_err(ApiError::BadRequest)?;

    let _guard = state.try_begin_decryption()?;

    state.contract.reader.get_assessment(id).await?;

    let decrypted = decrypt_field(&state.session, &state.contract, id, field).await?;

    let request_id = Uuid::new_v4();
    if let Some(requester) = state.session.address {
        if let Err(e) = db::insert_decryption(&state.db, request_id, id, field, requester).await {
            tracing::warn!(error = %e, %request_id, assessment_id = %id, field = field.name(), "decryption journal write failed");
        }
    }

    tracing::info!(%request_id, assessment_id = %id, field = field.name(), "decryption served");

    Ok(Json(DecryptResponse {
        assessment_id: id.to_string(),
        field: field.name().to_string(),
        value: decrypted.value,
    }))
}

async fn get_user_assessments(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<UserAssessmentsResponse>, ApiError> {
    let address = parse_address(&address)?;
    let ids = state.contract.reader.get_user_assessments(address).await?;

    Ok(Json(UserAssessmentsResponse {
        address: address.to_string(),
        assessment_ids: ids.iter().map(ToString::to_string).collect(),
    }))
}

async fn get_user_profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let address = parse_address(&address)?;
    let profile = state.contract.reader.get_user_profile(address).await?;

    Ok(Json(UserProfileResponse {
        address: address.to_string(),
        exists: profile.exists,
        total_assessments: profile.total_assessments,
        total_deposits_wei: profile.total_deposits.to_string(),
        total_withdrawals_wei: profile.total_withdrawals.to_string(),
        is_active: profile.is_active,
        balance_wei: profile.balance.to_string(),
    }))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.contract.reader.get_contract_stats().await?;

    Ok(Json(StatsResponse {
        assessments: stats.assessments,
        deposits_wei: stats.deposits.to_string(),
        withdrawals_wei: stats.withdrawals.to_string(),
        contract_balance_wei: stats.contract_balance.to_string(),
    }))
}

async fn get_deployment(State(state): State<AppState>) -> Json<DeploymentRecord> {
    Json(state.deployment.clone())
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<SubmissionListResponse>, ApiError> {
    let (offset, limit) = page(&params);
    let submissions = db::list_submissions(&state.db, offset, limit).await?;

    Ok(Json(SubmissionListResponse {
        offset,
        limit,
        submissions,
    }))
}

async fn list_decryptions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DecryptionListResponse>, ApiError> {
    let (offset, limit) = page(&params);
    let decryptions = db::list_decryptions(&state.db, offset, limit).await?;

    Ok(Json(DecryptionListResponse {
        offset,
        limit,
        decryptions,
    }))
}
