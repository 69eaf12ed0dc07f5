//! Capital ledger and three-level referral payout engine.
//!
//! All state lives in a [`Store`]. Workflows (registration, deposit approval,
//! withdrawal, admin adjustments) are methods on `Store`, each running as one
//! unit of work that either commits entirely or leaves nothing behind.

pub mod admin;
pub mod capital;
pub mod deposits;
pub mod error;
pub mod journal;
pub mod referral;
pub mod rewards;
pub mod store;
pub mod types;
pub mod users;
pub mod withdrawals;

pub use error::{LedgerError, Result};
pub use rewards::{ReferralLevel, reward};
pub use store::{Store, StoreTx};
pub use users::{CodeGenerator, RandomCodes};
