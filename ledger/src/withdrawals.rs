use crate::error::{LedgerError, Result};
use crate::store::Store;
use crate::types::{Transaction, TransactionType, WithdrawalReceipt};

pub const MIN_WITHDRAWAL: f64 = 10.0;
/// Share of the requested amount kept by the platform
pub const WITHDRAWAL_FEE_RATE: f64 = 0.20;

impl Store {
    /// Withdraws from the profit buffer.
    ///
    /// The ledger is debited by the gross `amount` while the transaction row
    /// records the net amount paid out; the fee stays with the platform and is
    /// not ledgered separately.
    pub fn create_withdrawal(
        &self,
        user_id: &str,
        amount: f64,
        wallet_address: &str,
    ) -> Result<WithdrawalReceipt> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(format!(
                "withdrawal amount must be greater than 0, got {}",
                amount
            )));
        }
        if amount < MIN_WITHDRAWAL {
            return Err(LedgerError::InvalidAmount(format!(
                "minimum withdrawal is {} USDT",
                MIN_WITHDRAWAL
            )));
        }

        let fee = amount * WITHDRAWAL_FEE_RATE;
        let net_amount = amount - fee;
        let wallet_address = wallet_address.trim();

        self.transaction(|tx| {
            tx.debit_profit(user_id, amount)?;
            tx.append(
                user_id,
                TransactionType::Withdrawal,
                net_amount,
                format!(
                    "Withdrawal of {:.2} USDT (after {:.2} USDT fee) to wallet: {}",
                    net_amount, fee, wallet_address
                ),
            );
            Ok(())
        })
        .inspect_err(|e| tracing::warn!("Withdrawal of {} by {} refused: {}", amount, user_id, e))?;

        tracing::info!(
            "User {} withdrew {} USDT (fee {:.2}, net {:.2})",
            user_id,
            amount,
            fee,
            net_amount
        );
        Ok(WithdrawalReceipt {
            amount,
            fee,
            net_amount,
            message: format!(
                "Withdrawal created, you will receive {:.2} USDT after fees",
                net_amount
            ),
        })
    }

    /// A user's withdrawal transactions, oldest first
    pub fn withdrawal_history(&self, user_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .begin()?
            .history(user_id, Some(TransactionType::Withdrawal)))
    }
}
