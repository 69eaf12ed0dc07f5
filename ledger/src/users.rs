use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::store::Store;
use crate::types::{Capital, Role, User, UserOverview};

pub const REFERRAL_CODE_PREFIX: &str = "ATLAS";
const REFERRAL_CODE_LEN: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 10;

/// Source of candidate referral codes. Uniqueness is checked by the store.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// `ATLAS` followed by six random uppercase alphanumerics
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn generate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFERRAL_CODE_LEN)
            .map(|c| char::from(c).to_ascii_uppercase())
            .collect();
        format!("{}{}", REFERRAL_CODE_PREFIX, suffix)
    }
}

impl Store {
    /// Registers a user under an optional referrer code.
    ///
    /// The referrer code is stored as given, even if nobody owns it yet.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        referred_by: Option<&str>,
        role: Role,
    ) -> Result<User> {
        let email = email.trim();
        let referred_by = referred_by
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        self.transaction(|tx| {
            if tx.user_by_email(email).is_some() {
                return Err(LedgerError::AlreadyRegistered(email.to_string()));
            }

            let referral_code = (0..MAX_CODE_ATTEMPTS)
                .map(|_| self.codes.generate())
                .find(|code| !code.is_empty() && !tx.code_exists(code))
                .ok_or(LedgerError::DuplicateReferralCode)?;

            let user = User {
                id: Uuid::new_v4().to_string(),
                username: username.trim().to_string(),
                email: email.to_string(),
                role,
                referral_code,
                referred_by,
                created_at: Utc::now(),
            };
            tx.insert_user(user.clone())?;

            tracing::info!(
                "Registered user {} with referral code {} (referred by {:?})",
                user.id,
                user.referral_code,
                user.referred_by
            );
            Ok(user)
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.begin()?
            .user(user_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound("User", user_id.to_string()))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.begin()?.user_by_email(email.trim()).cloned())
    }

    /// Capital projection for a user, created empty on first access
    pub fn get_capital(&self, user_id: &str) -> Result<Capital> {
        self.transaction(|tx| {
            if tx.user(user_id).is_none() {
                return Err(LedgerError::NotFound("User", user_id.to_string()));
            }
            Ok(tx.get_or_create_capital(user_id))
        })
    }

    /// Every user with their balances, oldest registration first
    pub fn list_users(&self) -> Result<Vec<UserOverview>> {
        let tx = self.begin()?;
        let mut users: Vec<&User> = tx.users().collect();
        users.sort_by_key(|u| u.created_at);

        Ok(users
            .into_iter()
            .map(|user| {
                let capital = tx.capital(&user.id);
                UserOverview {
                    id: user.id.clone(),
                    username: user.username.clone(),
                    email: user.email.clone(),
                    role: user.role,
                    funding: capital.map_or(0.0, |c| c.funding),
                    profit_buffer: capital.map_or(0.0, |c| c.profit_buffer),
                    available_capital: capital.map_or(0.0, |c| c.available_capital),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Hands out codes from a fixed list, repeating the last one forever
    struct FixedCodes {
        codes: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl CodeGenerator for FixedCodes {
        fn generate(&self) -> String {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            self.codes[i.min(self.codes.len() - 1)].to_string()
        }
    }

    fn fixed_store(codes: Vec<&'static str>) -> (Store, Arc<FixedCodes>) {
        let generator = Arc::new(FixedCodes {
            codes,
            calls: AtomicUsize::new(0),
        });
        (Store::with_code_generator(generator.clone()), generator)
    }

    #[test]
    fn test_random_code_format() {
        let code = RandomCodes.generate();
        assert!(code.starts_with(REFERRAL_CODE_PREFIX));
        assert_eq!(code.len(), REFERRAL_CODE_PREFIX.len() + REFERRAL_CODE_LEN);
        assert!(
            code[REFERRAL_CODE_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_register_assigns_code_and_referrer() {
        let store = Store::new();
        let alice = store
            .register("alice", "alice@example.com", None, Role::User)
            .unwrap();
        let bob = store
            .register(
                "bob",
                "bob@example.com",
                Some(&alice.referral_code),
                Role::User,
            )
            .unwrap();

        assert_ne!(alice.referral_code, bob.referral_code);
        assert_eq!(bob.referred_by.as_deref(), Some(alice.referral_code.as_str()));
        assert_eq!(store.get_user(&bob.id).unwrap(), bob);
    }

    #[test]
    fn test_register_blank_referrer_is_none() {
        let store = Store::new();
        let user = store
            .register("carol", "carol@example.com", Some("  "), Role::User)
            .unwrap();
        assert!(user.referred_by.is_none());
    }

    #[test]
    fn test_register_duplicate_email() {
        let store = Store::new();
        store
            .register("dave", "dave@example.com", None, Role::User)
            .unwrap();
        let again = store.register("dave2", "DAVE@example.com", None, Role::User);
        assert!(matches!(again, Err(LedgerError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_register_retries_colliding_code() {
        let (store, generator) = fixed_store(vec!["ATLASAAAAAA", "ATLASAAAAAA", "ATLASBBBBBB"]);
        store.register("a", "a@example.com", None, Role::User).unwrap();
        let b = store.register("b", "b@example.com", None, Role::User).unwrap();

        assert_eq!(b.referral_code, "ATLASBBBBBB");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_register_exhausts_code_attempts() {
        let (store, _) = fixed_store(vec!["ATLASSAME00"]);
        store.register("a", "a@example.com", None, Role::User).unwrap();

        let result = store.register("b", "b@example.com", None, Role::User);
        assert_eq!(result, Err(LedgerError::DuplicateReferralCode));
        assert!(store.find_user_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn test_get_capital_requires_user() {
        let store = Store::new();
        let user = store.register("e", "e@example.com", None, Role::User).unwrap();

        let capital = store.get_capital(&user.id).unwrap();
        assert_eq!(capital.available_capital, 0.0);
        assert!(matches!(
            store.get_capital("nobody"),
            Err(LedgerError::NotFound("User", _))
        ));
    }
}
