use axum::{Json, http::StatusCode};
use ledger::LedgerError;
use serde::Serialize;

pub mod admin;
pub mod deposits;
pub mod referral;
pub mod users;
pub mod withdrawals;

// Envelope shared by every JSON endpoint
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> ApiResult<T> {
    (
        status,
        Json(ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        }),
    )
}

pub fn fail<T: Serialize>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (
        status,
        Json(ApiResponse {
            success: false,
            message: message.into(),
            data: None,
        }),
    )
}

pub fn status_for(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::NotFound(..) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyProcessed(_) | LedgerError::AlreadyRegistered(_) => {
            StatusCode::CONFLICT
        }
        LedgerError::InvalidAmount(_) | LedgerError::InvalidReason => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientProfit(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::DuplicateReferralCode | LedgerError::StorageFailure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// Turn a ledger failure into the typed failure body
pub fn from_ledger_error<T: Serialize>(error: LedgerError) -> ApiResult<T> {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Ledger operation failed: {}", error);
    }
    fail(status, error.to_string())
}

// Amounts arrive as JSON numbers or numeric strings
pub fn parse_amount(raw: &serde_json::Value) -> Option<f64> {
    let amount = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    amount.filter(|amount| amount.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&LedgerError::NotFound("Deposit", "1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&LedgerError::AlreadyProcessed(1)), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&LedgerError::InsufficientProfit(String::new())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&LedgerError::StorageFailure(String::new())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(12.5)), Some(12.5));
        assert_eq!(parse_amount(&json!(" 40 ")), Some(40.0));
        assert_eq!(parse_amount(&json!("abc")), None);
        assert_eq!(parse_amount(&json!("NaN")), None);
        assert_eq!(parse_amount(&json!(null)), None);
    }
}
