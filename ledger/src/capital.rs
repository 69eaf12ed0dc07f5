use crate::error::{LedgerError, Result};
use crate::store::StoreTx;
use crate::types::{Bucket, Capital};

/// Profit below this cannot be withdrawn at all
pub const MIN_PROFIT_FOR_WITHDRAWAL: f64 = 10.0;

fn ensure_positive(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than 0, got {}",
            amount
        )));
    }
    Ok(())
}

impl StoreTx<'_> {
    /// Returns the user's capital row, creating an all-zero one if absent
    pub fn get_or_create_capital(&mut self, user_id: &str) -> Capital {
        if let Some(capital) = self.capital(user_id) {
            return capital.clone();
        }
        let capital = Capital::zeroed(user_id);
        self.put_capital(capital.clone());
        capital
    }

    pub fn credit(&mut self, user_id: &str, amount: f64, bucket: Bucket) -> Result<Capital> {
        ensure_positive(amount)?;

        let mut capital = self.get_or_create_capital(user_id);
        match bucket {
            Bucket::Funding => capital.set(capital.funding + amount, capital.profit_buffer),
            Bucket::ProfitBuffer => capital.set(capital.funding, capital.profit_buffer + amount),
        }
        self.put_capital(capital.clone());
        Ok(capital)
    }

    /// Withdrawal debit: only profit is withdrawable, funding is never touched.
    /// Fails when the profit buffer is below the floor or smaller than `amount`.
    pub fn debit_profit(&mut self, user_id: &str, amount: f64) -> Result<Capital> {
        ensure_positive(amount)?;

        let mut capital = self
            .capital(user_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound("Capital", user_id.to_string()))?;

        if capital.profit_buffer < MIN_PROFIT_FOR_WITHDRAWAL {
            return Err(LedgerError::InsufficientProfit(format!(
                "at least {} USDT of profit is required to withdraw",
                MIN_PROFIT_FOR_WITHDRAWAL
            )));
        }
        if amount > capital.profit_buffer {
            return Err(LedgerError::InsufficientProfit(format!(
                "cannot withdraw more than {:.2} USDT of available profit",
                capital.profit_buffer
            )));
        }

        capital.set(capital.funding, capital.profit_buffer - amount);
        self.put_capital(capital.clone());
        Ok(capital)
    }

    /// Admin deduction: profit first, then funding, floored at zero.
    /// Any excess over total capital is absorbed.
    pub fn debit_with_cascade(&mut self, user_id: &str, amount: f64) -> Result<Capital> {
        ensure_positive(amount)?;

        let mut capital = self.get_or_create_capital(user_id);
        if capital.profit_buffer >= amount {
            capital.set(capital.funding, capital.profit_buffer - amount);
        } else {
            let remainder = amount - capital.profit_buffer;
            capital.set((capital.funding - remainder).max(0.0), 0.0);
        }
        self.put_capital(capital.clone());
        Ok(capital)
    }

    /// Admin override. Fields left as None keep their current value.
    pub fn set_capital(
        &mut self,
        user_id: &str,
        funding: Option<f64>,
        profit_buffer: Option<f64>,
    ) -> Result<Capital> {
        for value in [funding, profit_buffer].into_iter().flatten() {
            if !value.is_finite() || value < 0.0 {
                return Err(LedgerError::InvalidAmount(format!(
                    "capital values cannot be negative, got {}",
                    value
                )));
            }
        }

        let mut capital = self.get_or_create_capital(user_id);
        capital.set(
            funding.unwrap_or(capital.funding),
            profit_buffer.unwrap_or(capital.profit_buffer),
        );
        self.put_capital(capital.clone());
        Ok(capital)
    }

    pub fn reset_capital(&mut self, user_id: &str) -> Capital {
        let mut capital = self.get_or_create_capital(user_id);
        capital.set(0.0, 0.0);
        self.put_capital(capital.clone());
        capital
    }
}
