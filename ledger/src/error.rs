use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Deposit {0} has already been processed")]
    AlreadyProcessed(u64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient profit: {0}")]
    InsufficientProfit(String),

    #[error("Failed to generate a unique referral code")]
    DuplicateReferralCode,

    #[error("A user with email {0} already exists")]
    AlreadyRegistered(String),

    #[error("A rejection reason is required")]
    InvalidReason,

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
