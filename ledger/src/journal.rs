use chrono::Utc;

use crate::store::StoreTx;
use crate::types::{Transaction, TransactionType};

impl StoreTx<'_> {
    /// Appends an audit record. Rows are never updated or removed afterwards.
    pub fn append(
        &mut self,
        user_id: &str,
        kind: TransactionType,
        amount: f64,
        description: String,
    ) -> Transaction {
        self.push_transaction(Transaction {
            id: 0,
            user_id: user_id.to_string(),
            kind,
            amount,
            is_compliant: true,
            description,
            created_at: Utc::now(),
        })
    }

    /// A user's transactions in insertion order, optionally of one type
    pub fn history(&self, user_id: &str, kind: Option<TransactionType>) -> Vec<Transaction> {
        self.transactions()
            .iter()
            .filter(|t| t.user_id == user_id && kind.is_none_or(|k| t.kind == k))
            .cloned()
            .collect()
    }

    /// Newest first, at most `limit` rows
    pub fn recent(&self, user_id: &str, limit: usize) -> Vec<Transaction> {
        self.transactions()
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_append_assigns_sequential_ids() {
        let store = Store::new();
        let mut tx = store.begin().unwrap();
        let first = tx.append("u1", TransactionType::Deposit, 100.0, "a".to_string());
        let second = tx.append("u2", TransactionType::AdminAdd, 5.0, "b".to_string());

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.is_compliant);
        assert_eq!(tx.transactions().len(), 2);
    }

    #[test]
    fn test_history_filters_by_user_and_type() {
        let store = Store::new();
        let mut tx = store.begin().unwrap();
        tx.append("u1", TransactionType::Deposit, 100.0, String::new());
        tx.append("u1", TransactionType::Withdrawal, 8.0, String::new());
        tx.append("u2", TransactionType::Withdrawal, 16.0, String::new());
        tx.append("u1", TransactionType::Withdrawal, 24.0, String::new());

        let all = tx.history("u1", None);
        assert_eq!(all.len(), 3);

        let withdrawals = tx.history("u1", Some(TransactionType::Withdrawal));
        let amounts: Vec<f64> = withdrawals.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![8.0, 24.0]);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = Store::new();
        let mut tx = store.begin().unwrap();
        for amount in [1.0, 2.0, 3.0, 4.0] {
            tx.append("u1", TransactionType::AdminAdd, amount, String::new());
        }

        let recent = tx.recent("u1", 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, 4.0);
        assert_eq!(recent[1].amount, 3.0);
    }

    #[test]
    fn test_wire_format_uses_type_and_camel_case() {
        let store = Store::new();
        let mut tx = store.begin().unwrap();
        let entry = tx.append(
            "u1",
            TransactionType::ReferralCommission,
            7.0,
            "EMP-1 commission".to_string(),
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "referral_commission");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["isCompliant"], true);
        assert!(json.get("kind").is_none());
    }
}
