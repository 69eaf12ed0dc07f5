use crate::error::{LedgerError, Result};
use crate::store::{Store, StoreTx};
use crate::types::{BalanceAdjustment, Bucket, Capital, Transaction, TransactionType};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

fn require_user(tx: &StoreTx<'_>, user_id: &str) -> Result<()> {
    match tx.user(user_id) {
        Some(_) => Ok(()),
        None => Err(LedgerError::NotFound("User", user_id.to_string())),
    }
}

fn reason_or(reason: Option<&str>, default: String) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or(default)
}

impl Store {
    /// Adds to funding, or deducts profit-first with funding floored at zero
    pub fn update_balance(
        &self,
        user_id: &str,
        amount: f64,
        adjustment: BalanceAdjustment,
        reason: Option<&str>,
    ) -> Result<Capital> {
        let capital = self.transaction(|tx| {
            require_user(tx, user_id)?;
            let (capital, kind, default_reason) = match adjustment {
                BalanceAdjustment::Add => (
                    tx.credit(user_id, amount, Bucket::Funding)?,
                    TransactionType::AdminAdd,
                    format!("Balance added by admin: {} USDT", amount),
                ),
                BalanceAdjustment::Deduct => (
                    tx.debit_with_cascade(user_id, amount)?,
                    TransactionType::AdminDeduct,
                    format!("Balance deducted by admin: {} USDT", amount),
                ),
            };
            tx.append(user_id, kind, amount, reason_or(reason, default_reason));
            Ok(capital)
        })?;

        tracing::info!(
            "Admin {:?} of {} USDT on {}: funding {}, profit {}",
            adjustment,
            amount,
            user_id,
            capital.funding,
            capital.profit_buffer
        );
        Ok(capital)
    }

    pub fn reset_user_account(&self, user_id: &str) -> Result<Capital> {
        let capital = self.transaction(|tx| {
            require_user(tx, user_id)?;
            let capital = tx.reset_capital(user_id);
            tx.append(
                user_id,
                TransactionType::AdminReset,
                0.0,
                "Account reset by admin".to_string(),
            );
            Ok(capital)
        })?;

        tracing::info!("Admin reset the capital of {}", user_id);
        Ok(capital)
    }

    pub fn set_user_capital(
        &self,
        user_id: &str,
        funding: Option<f64>,
        profit_buffer: Option<f64>,
        reason: Option<&str>,
    ) -> Result<Capital> {
        let capital = self.transaction(|tx| {
            require_user(tx, user_id)?;
            let capital = tx.set_capital(user_id, funding, profit_buffer)?;
            let default_reason = format!(
                "Capital set by admin - funding: {}, profit: {}",
                capital.funding, capital.profit_buffer
            );
            tx.append(
                user_id,
                TransactionType::AdminSetCapital,
                capital.available_capital,
                reason_or(reason, default_reason),
            );
            Ok(capital)
        })?;

        tracing::info!(
            "Admin set capital of {}: funding {}, profit {}",
            user_id,
            capital.funding,
            capital.profit_buffer
        );
        Ok(capital)
    }

    /// Newest first, at most `limit` rows
    pub fn user_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self.begin()?.recent(user_id, limit))
    }
}
