use ledger::types::{Role, User};
use serde::{Deserialize, Serialize};

// A login identity bound to a ledger user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Account {
    pub fn new(session_id: String, user: &User) -> Self {
        Self {
            session_id,
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

// What handlers see after the session has been checked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Account> for AuthenticatedUser {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.user_id,
            username: account.username,
            email: account.email,
            role: account.role,
        }
    }
}
