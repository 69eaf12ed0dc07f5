use crate::error::{LedgerError, Result};
use crate::rewards::{ReferralLevel, reward};
use crate::store::Store;
use crate::types::{
    ApprovalReceipt, Bucket, Deposit, DepositOverview, DepositStatus, Payout, TransactionType,
};

impl Store {
    /// Files a pending deposit request for admin review
    pub fn create_deposit(
        &self,
        user_id: &str,
        amount: f64,
        wallet_address: Option<String>,
    ) -> Result<Deposit> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(format!(
                "deposit amount must be greater than 0, got {}",
                amount
            )));
        }
        let wallet_address = wallet_address
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        self.transaction(|tx| {
            if tx.user(user_id).is_none() {
                return Err(LedgerError::NotFound("User", user_id.to_string()));
            }
            let deposit = tx.insert_deposit(user_id, amount, wallet_address);
            tracing::info!(
                "Deposit request {} of {} USDT created for user {}",
                deposit.id,
                amount,
                user_id
            );
            Ok(deposit)
        })
    }

    /// A user's deposits, oldest first
    pub fn deposit_history(&self, user_id: &str) -> Result<Vec<Deposit>> {
        let tx = self.begin()?;
        let mut deposits: Vec<Deposit> = tx
            .deposits()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        deposits.sort_by_key(|d| d.id);
        Ok(deposits)
    }

    /// Every deposit with its owner's details, newest first
    pub fn list_deposits(&self) -> Result<Vec<DepositOverview>> {
        let tx = self.begin()?;
        let mut deposits: Vec<DepositOverview> = tx
            .deposits()
            .map(|deposit| {
                let owner = tx.user(&deposit.user_id);
                DepositOverview {
                    deposit: deposit.clone(),
                    username: owner.map(|u| u.username.clone()),
                    email: owner.map(|u| u.email.clone()),
                }
            })
            .collect();
        deposits.sort_by(|a, b| b.deposit.id.cmp(&a.deposit.id));
        Ok(deposits)
    }

    /// Confirms a pending deposit: credits the depositor's funding, then pays
    /// commission into the profit buffer of each upline member. Every balance
    /// change gets a transaction row. All of it commits together or not at all.
    pub fn approve_deposit(&self, deposit_id: u64) -> Result<ApprovalReceipt> {
        let receipt = self.transaction(|tx| {
            let deposit = tx.transition_deposit(
                deposit_id,
                DepositStatus::Pending,
                DepositStatus::Confirmed,
                None,
            )?;
            let amount = deposit.amount;

            tx.credit(&deposit.user_id, amount, Bucket::Funding)?;
            tx.append(
                &deposit.user_id,
                TransactionType::Deposit,
                amount,
                format!("Confirmed deposit of {} USDT", amount),
            );

            let mut payouts = Vec::new();
            let upline = tx.resolve_upline(&deposit.user_id);
            for (depth, referrer) in upline.iter().enumerate() {
                let Some(level) = ReferralLevel::from_depth(depth + 1) else {
                    break;
                };
                let commission = reward(amount, level);
                if commission <= 0.0 {
                    continue;
                }

                tx.credit(&referrer.id, commission, Bucket::ProfitBuffer)?;
                tx.append(
                    &referrer.id,
                    TransactionType::ReferralCommission,
                    commission,
                    format!(
                        "{} commission ({}%) from deposit of {} USDT",
                        level.name(),
                        level.percentage(),
                        amount
                    ),
                );
                tracing::debug!(
                    "Paid {} commission of {} USDT to {} for deposit {}",
                    level.name(),
                    commission,
                    referrer.id,
                    deposit_id
                );
                payouts.push(Payout {
                    user_id: referrer.id.clone(),
                    level: level.number(),
                    amount: commission,
                });
            }

            Ok(ApprovalReceipt {
                deposit_id,
                depositor_id: deposit.user_id,
                amount,
                payouts,
            })
        });

        match &receipt {
            Ok(receipt) => tracing::info!(
                "Approved deposit {} of {} USDT for user {} with {} referral payouts",
                deposit_id,
                receipt.amount,
                receipt.depositor_id,
                receipt.payouts.len()
            ),
            Err(e) => tracing::warn!("Failed to approve deposit {}: {}", deposit_id, e),
        }
        receipt
    }

    /// Marks a pending deposit as failed. No capital is touched.
    pub fn reject_deposit(&self, deposit_id: u64, reason: &str) -> Result<Deposit> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::InvalidReason);
        }

        let deposit = self.transaction(|tx| {
            tx.transition_deposit(
                deposit_id,
                DepositStatus::Pending,
                DepositStatus::Failed,
                Some(reason.to_string()),
            )
        })?;
        tracing::info!("Rejected deposit {}: {}", deposit_id, reason);
        Ok(deposit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, User};

    fn setup_store() -> (Store, User) {
        let store = Store::new();
        let user = store
            .register("depositor", "depositor@example.com", None, Role::User)
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_create_deposit_is_pending() {
        let (store, user) = setup_store();
        let deposit = store
            .create_deposit(&user.id, 75.0, Some(" TXyz ".to_string()))
            .unwrap();

        assert_eq!(deposit.status, DepositStatus::Pending);
        assert_eq!(deposit.wallet_address.as_deref(), Some("TXyz"));
        assert_eq!(store.deposit_history(&user.id).unwrap(), vec![deposit]);
    }

    #[test]
    fn test_create_deposit_validation() {
        let (store, user) = setup_store();
        assert!(matches!(
            store.create_deposit(&user.id, 0.0, None),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            store.create_deposit(&user.id, -5.0, None),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            store.create_deposit("ghost", 5.0, None),
            Err(LedgerError::NotFound("User", _))
        ));
    }

    #[test]
    fn test_approve_credits_funding_once() {
        let (store, user) = setup_store();
        let deposit = store.create_deposit(&user.id, 100.0, None).unwrap();

        let receipt = store.approve_deposit(deposit.id).unwrap();
        assert!(receipt.payouts.is_empty());
        assert_eq!(
            store.approve_deposit(deposit.id),
            Err(LedgerError::AlreadyProcessed(deposit.id))
        );

        let capital = store.get_capital(&user.id).unwrap();
        assert_eq!(capital.funding, 100.0);
        assert_eq!(capital.profit_buffer, 0.0);
        assert_eq!(store.deposit_history(&user.id).unwrap()[0].status, DepositStatus::Confirmed);
    }

    #[test]
    fn test_approve_missing_deposit() {
        let (store, _) = setup_store();
        assert!(matches!(
            store.approve_deposit(42),
            Err(LedgerError::NotFound("Deposit", _))
        ));
    }

    #[test]
    fn test_reject_deposit() {
        let (store, user) = setup_store();
        let deposit = store.create_deposit(&user.id, 60.0, None).unwrap();

        assert_eq!(
            store.reject_deposit(deposit.id, "   "),
            Err(LedgerError::InvalidReason)
        );
        let rejected = store.reject_deposit(deposit.id, "hash not found").unwrap();
        assert_eq!(rejected.status, DepositStatus::Failed);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("hash not found"));

        assert_eq!(
            store.approve_deposit(deposit.id),
            Err(LedgerError::AlreadyProcessed(deposit.id))
        );
        assert_eq!(
            store.reject_deposit(deposit.id, "again"),
            Err(LedgerError::AlreadyProcessed(deposit.id))
        );
        assert_eq!(store.get_capital(&user.id).unwrap().funding, 0.0);
    }

    #[test]
    fn test_small_deposit_pays_no_commission() {
        let (store, referrer) = setup_store();
        let user = store
            .register(
                "small",
                "small@example.com",
                Some(&referrer.referral_code),
                Role::User,
            )
            .unwrap();
        let deposit = store.create_deposit(&user.id, 20.0, None).unwrap();

        let receipt = store.approve_deposit(deposit.id).unwrap();
        assert!(receipt.payouts.is_empty());
        assert_eq!(store.get_capital(&referrer.id).unwrap().profit_buffer, 0.0);
    }

    #[test]
    fn test_list_deposits_newest_first() {
        let (store, user) = setup_store();
        store.create_deposit(&user.id, 10.0, None).unwrap();
        store.create_deposit(&user.id, 20.0, None).unwrap();

        let listed = store.list_deposits().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].deposit.amount, 20.0);
        assert_eq!(listed[0].username.as_deref(), Some("depositor"));
    }
}
