use super::error::ApiError;
use super::types::{
    AdminLoginRequest, ApiResponse, HealthResponse, LoginUserRequest, VerifyAndVoteRequest,
};
use crate::admin::{self, AdminLogin};
use crate::server::AppState;
use crate::types::{ElectionSummary, PARTIES, Party};
use crate::verification::VoteRequest;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use std::sync::Arc;
use tracing::{debug, warn};

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn parties_handler() -> Json<&'static [Party]> {
    Json(PARTIES)
}

pub async fn login_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginUserRequest>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(request) = payload?;

    let response = match state.verification.login(&request.name, &request.aadhar) {
        Ok(()) => ApiResponse::ok("Login successful"),
        Err(rejection) => ApiResponse::rejected(rejection.to_string()),
    };
    Ok(Json(response))
}

pub async fn verify_and_vote_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyAndVoteRequest>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(request) = payload?;

    let outcome = state
        .verification
        .verify_and_vote(VoteRequest {
            name: request.name,
            aadhar: request.aadhar,
            party: request.party,
            image: request.image,
        })
        .await?;

    let response = match outcome {
        Ok(confirmation) => ApiResponse::ok(confirmation.message())
            .with_receipt(confirmation.receipt.receipt_id)
            .with_tally(confirmation.tally),
        Err(rejection) => {
            warn!("Vote rejected: {}", rejection);
            ApiResponse::rejected(rejection.to_string())
        }
    };
    Ok(Json(response))
}

pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(request) = payload?;

    match admin::authenticate(&state.config.data.admins_csv, &request.email, &request.password)
        .await?
    {
        AdminLogin::Authenticated { name } => Ok(Json(ApiResponse::admin(name))),
        AdminLogin::InvalidCredentials => Ok(Json(ApiResponse::rejected("Invalid credentials"))),
        AdminLogin::DirectoryMissing => Err(ApiError::AdminsFileMissing),
    }
}

pub async fn admin_summary_handler(State(state): State<Arc<AppState>>) -> ApiResult<ElectionSummary> {
    let live = state.verification.ballot().tally()?;
    Ok(Json(admin::election_summary(live)))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let votes = state.verification.ballot().total_votes()?;
    debug!("Health check: {} votes recorded", votes);

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        registered: state.verification.registry().len(),
        enrolled: state.verification.enrollment().len(),
        votes,
    }))
}
