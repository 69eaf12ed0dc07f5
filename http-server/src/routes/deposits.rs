use axum::{Json, extract::State, http::StatusCode};
use ledger::types::Deposit;
use serde::Deserialize;

use super::{ApiResult, fail, from_ledger_error, ok, parse_amount};
use crate::{AppState, middleware::AuthUser};

// Create deposit request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositRequest {
    pub amount: serde_json::Value,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

// File a pending deposit for admin review
pub async fn create_deposit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateDepositRequest>,
) -> ApiResult<Deposit> {
    let Some(amount) = parse_amount(&payload.amount) else {
        return fail(StatusCode::BAD_REQUEST, "Amount must be a number");
    };

    match state
        .store
        .create_deposit(&user.user_id, amount, payload.wallet_address)
    {
        Ok(deposit) => ok(
            StatusCode::CREATED,
            format!(
                "Deposit request of {} USDT created, awaiting admin approval",
                amount
            ),
            deposit,
        ),
        Err(e) => from_ledger_error(e),
    }
}

// The caller's deposit requests, oldest first
pub async fn deposit_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<Deposit>> {
    match state.store.deposit_history(&user.user_id) {
        Ok(deposits) => ok(StatusCode::OK, "Deposit history retrieved", deposits),
        Err(e) => from_ledger_error(e),
    }
}
