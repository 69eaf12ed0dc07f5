use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ledger::admin::DEFAULT_HISTORY_LIMIT;
use ledger::types::{
    ApprovalReceipt, BalanceAdjustment, Capital, Deposit, DepositOverview, Transaction,
    UserOverview,
};
use serde::Deserialize;

use super::{ApiResult, fail, from_ledger_error, ok, parse_amount};
use crate::{
    AppState,
    middleware::AdminUser,
    websocket::{NotificationType, send_approval_notifications, send_notification_to_user},
};

// Reject deposit request
#[derive(Deserialize)]
pub struct RejectDepositRequest {
    pub reason: String,
}

// Update balance request
#[derive(Deserialize)]
pub struct UpdateBalanceRequest {
    pub amount: serde_json::Value,
    #[serde(rename = "type")]
    pub adjustment: BalanceAdjustment,
    #[serde(default)]
    pub reason: Option<String>,
}

// Set capital request, omitted fields keep their value
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCapitalRequest {
    #[serde(default)]
    pub funding: Option<f64>,
    #[serde(default)]
    pub profit_buffer: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

// Transaction listing query parameters
#[derive(Deserialize)]
pub struct TransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

// All deposits, newest first
pub async fn list_deposits(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Vec<DepositOverview>> {
    match state.store.list_deposits() {
        Ok(deposits) => ok(StatusCode::OK, "Deposits retrieved", deposits),
        Err(e) => from_ledger_error(e),
    }
}

// Approve deposit endpoint
pub async fn approve_deposit(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(deposit_id): Path<u64>,
) -> ApiResult<ApprovalReceipt> {
    match state.store.approve_deposit(deposit_id) {
        Ok(receipt) => {
            tracing::info!("Admin {} approved deposit {}", admin.user_id, deposit_id);
            send_approval_notifications(&state.notification_manager, &receipt);
            ok(StatusCode::OK, "Deposit approved successfully", receipt)
        }
        Err(e) => from_ledger_error(e),
    }
}

// Reject deposit endpoint
pub async fn reject_deposit(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(deposit_id): Path<u64>,
    Json(payload): Json<RejectDepositRequest>,
) -> ApiResult<Deposit> {
    match state.store.reject_deposit(deposit_id, &payload.reason) {
        Ok(deposit) => {
            tracing::info!("Admin {} rejected deposit {}", admin.user_id, deposit_id);
            send_notification_to_user(
                &state.notification_manager,
                &deposit.user_id,
                NotificationType::DepositRejected {
                    deposit_id,
                    reason: payload.reason.trim().to_string(),
                },
            );
            ok(StatusCode::OK, "Deposit rejected", deposit)
        }
        Err(e) => from_ledger_error(e),
    }
}

// Every user with balances
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Vec<UserOverview>> {
    match state.store.list_users() {
        Ok(users) => ok(StatusCode::OK, "Users retrieved", users),
        Err(e) => from_ledger_error(e),
    }
}

// Add to or deduct from a user's balance
pub async fn update_balance(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateBalanceRequest>,
) -> ApiResult<Capital> {
    let Some(amount) = parse_amount(&payload.amount) else {
        return fail(StatusCode::BAD_REQUEST, "Amount must be a number");
    };

    match state.store.update_balance(
        &user_id,
        amount,
        payload.adjustment,
        payload.reason.as_deref(),
    ) {
        Ok(capital) => {
            let message = match payload.adjustment {
                BalanceAdjustment::Add => "Balance added successfully",
                BalanceAdjustment::Deduct => "Balance deducted successfully",
            };
            ok(StatusCode::OK, message, capital)
        }
        Err(e) => from_ledger_error(e),
    }
}

// Zero out a user's capital
pub async fn reset_user_account(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<String>,
) -> ApiResult<Capital> {
    match state.store.reset_user_account(&user_id) {
        Ok(capital) => ok(StatusCode::OK, "User account reset successfully", capital),
        Err(e) => from_ledger_error(e),
    }
}

// Overwrite funding and/or profit buffer
pub async fn set_user_capital(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<String>,
    Json(payload): Json<SetCapitalRequest>,
) -> ApiResult<Capital> {
    match state.store.set_user_capital(
        &user_id,
        payload.funding,
        payload.profit_buffer,
        payload.reason.as_deref(),
    ) {
        Ok(capital) => ok(StatusCode::OK, "User capital set successfully", capital),
        Err(e) => from_ledger_error(e),
    }
}

// A user's audit trail, newest first
pub async fn user_transactions(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<String>,
    Query(params): Query<TransactionsQuery>,
) -> ApiResult<Vec<Transaction>> {
    match state.store.user_transactions(&user_id, params.limit) {
        Ok(transactions) => ok(StatusCode::OK, "Transactions retrieved", transactions),
        Err(e) => from_ledger_error(e),
    }
}
