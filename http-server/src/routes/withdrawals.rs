use axum::{Json, extract::State, http::StatusCode};
use ledger::types::{Transaction, WithdrawalReceipt};
use serde::Deserialize;

use super::{ApiResult, fail, from_ledger_error, ok, parse_amount};
use crate::{
    AppState,
    middleware::AuthUser,
    websocket::{NotificationType, send_notification_to_user},
};

// Create withdrawal request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub amount: serde_json::Value,
    pub wallet_address: String,
}

// Withdraw from accumulated profit
pub async fn create_withdrawal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateWithdrawalRequest>,
) -> ApiResult<WithdrawalReceipt> {
    if payload.wallet_address.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Wallet address is required");
    }
    let Some(amount) = parse_amount(&payload.amount) else {
        return fail(StatusCode::BAD_REQUEST, "Amount must be a number");
    };

    match state
        .store
        .create_withdrawal(&user.user_id, amount, &payload.wallet_address)
    {
        Ok(receipt) => {
            send_notification_to_user(
                &state.notification_manager,
                &user.user_id,
                NotificationType::WithdrawalCreated {
                    amount: receipt.amount,
                    fee: receipt.fee,
                    net_amount: receipt.net_amount,
                },
            );
            let message = receipt.message.clone();
            ok(StatusCode::CREATED, message, receipt)
        }
        Err(e) => from_ledger_error(e),
    }
}

// The caller's withdrawals, oldest first
pub async fn withdrawal_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<Transaction>> {
    match state.store.withdrawal_history(&user.user_id) {
        Ok(history) => ok(StatusCode::OK, "Withdrawal history retrieved", history),
        Err(e) => from_ledger_error(e),
    }
}
