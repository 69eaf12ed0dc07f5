use axum::{Json, extract::State, http::StatusCode};
use ledger::types::{Capital, Role};
use serde::{Deserialize, Serialize};

use super::{ApiResult, fail, from_ledger_error, ok};
use crate::{AppState, middleware::AuthUser, models::AuthenticatedUser};

const MIN_PASSWORD_LEN: usize = 6;

// Register request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// Returned by both register and login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub user: AuthenticatedUser,
    pub referral_code: Option<String>,
}

// Register endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<SessionResponse> {
    // Validate input
    if payload.username.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Username is required");
    }
    if !payload.email.contains('@') {
        return fail(StatusCode::BAD_REQUEST, "A valid email is required");
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return fail(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }

    let user = match state.store.register(
        &payload.username,
        &payload.email,
        payload.referral_code.as_deref(),
        Role::User,
    ) {
        Ok(user) => user,
        Err(e) => return from_ledger_error(e),
    };

    let account = match state.sessions.create_session(&payload.password, &user) {
        Ok(account) => account,
        Err(message) => return fail(StatusCode::INTERNAL_SERVER_ERROR, message),
    };

    ok(
        StatusCode::CREATED,
        "User registered successfully",
        SessionResponse {
            session_id: account.session_id.clone(),
            user: AuthenticatedUser::from(account),
            referral_code: Some(user.referral_code),
        },
    )
}

// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    // Validate input
    if payload.email.is_empty() || payload.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Email and password are required");
    }

    match state.sessions.login(&payload.email, &payload.password) {
        Some(account) => {
            let referral_code = state
                .store
                .get_user(&account.user_id)
                .ok()
                .map(|user| user.referral_code);
            ok(
                StatusCode::OK,
                "Login successful",
                SessionResponse {
                    session_id: account.session_id.clone(),
                    user: AuthenticatedUser::from(account),
                    referral_code,
                },
            )
        }
        None => fail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

// Get user profile endpoint (protected route)
pub async fn get_profile(AuthUser(user): AuthUser) -> ApiResult<AuthenticatedUser> {
    ok(StatusCode::OK, "Profile retrieved successfully", user)
}

// Current balances of the caller
pub async fn get_capital(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Capital> {
    match state.store.get_capital(&user.user_id) {
        Ok(capital) => ok(StatusCode::OK, "Capital retrieved successfully", capital),
        Err(e) => from_ledger_error(e),
    }
}
