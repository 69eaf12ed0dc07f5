use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Unique invite token, generated once at registration
    pub referral_code: String,
    /// The referral code of whoever invited this user (not their id)
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which capital bucket a credit lands in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Principal from confirmed deposits
    Funding,
    /// Commissions and other non-principal credits, the only withdrawable bucket
    ProfitBuffer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capital {
    pub user_id: String,
    pub funding: f64,
    pub profit_buffer: f64,
    /// Always funding + profit_buffer, recomputed on every write
    pub available_capital: f64,
    pub updated_at: DateTime<Utc>,
}

impl Capital {
    pub fn zeroed(user_id: &str) -> Self {
        Capital {
            user_id: user_id.to_string(),
            funding: 0.0,
            profit_buffer: 0.0,
            available_capital: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn set(&mut self, funding: f64, profit_buffer: f64) {
        self.funding = funding;
        self.profit_buffer = profit_buffer;
        self.available_capital = funding + profit_buffer;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: u64,
    pub user_id: String,
    pub amount: f64,
    pub wallet_address: Option<String>,
    pub status: DepositStatus,
    /// Only set when status is Failed
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    ReferralCommission,
    AdminAdd,
    AdminDeduct,
    AdminReset,
    AdminSetCapital,
}

/// Append-only audit record, one per balance mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
    /// Reserved for compliance tagging, currently always true
    pub is_compliant: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A commission paid to one upline member during a deposit approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub user_id: String,
    pub level: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalReceipt {
    pub deposit_id: u64,
    pub depositor_id: String,
    pub amount: f64,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    pub referral_code: String,
    pub referral_link: String,
}

/// Downline head-counts per level, regardless of deposit activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTeam {
    pub level1: usize,
    pub level2: usize,
    pub level3: usize,
    pub total: usize,
}

/// Admin listing row: a user joined with its capital (zeros when absent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub funding: f64,
    pub profit_buffer: f64,
    pub available_capital: f64,
}

/// Admin listing row: a deposit joined with its owner's name and email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositOverview {
    #[serde(flatten)]
    pub deposit: Deposit,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceAdjustment {
    Add,
    Deduct,
}
