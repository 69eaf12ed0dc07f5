use anyhow::Context;
use hex;
use ledger::types::User;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::Account;

// Session table keyed by session id, optionally mirrored to a JSON file
#[derive(Clone, Default)]
pub struct SessionStore {
    pub accounts: Arc<Mutex<HashMap<String, Account>>>,
    snapshot: Option<PathBuf>,
}

impl SessionStore {
    // Load the sessions saved at `path`, empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let accounts: HashMap<String, Account> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt session file {}", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        tracing::info!("Loaded {} sessions from {}", accounts.len(), path.display());

        Ok(Self {
            accounts: Arc::new(Mutex::new(accounts)),
            snapshot: Some(path),
        })
    }

    // Session id is a hash of the normalized email and the password
    pub fn session_id_for(email: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.trim().to_lowercase().as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    // Bind a session to a freshly registered ledger user
    pub fn create_session(&self, password: &str, user: &User) -> Result<Account, String> {
        let session_id = Self::session_id_for(&user.email, password);
        let account = Account::new(session_id.clone(), user);

        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| "Session store unavailable".to_string())?;
        let prev = accounts.insert(session_id.clone(), account.clone());

        if let Some(path) = &self.snapshot {
            if let Err(e) = save_accounts(path, &accounts) {
                tracing::error!("Failed to save sessions to {}: {:#}", path.display(), e);
                match prev {
                    Some(prev) => accounts.insert(session_id, prev),
                    None => accounts.remove(&session_id),
                };
                return Err("Session store unavailable".to_string());
            }
        }
        Ok(account)
    }

    // Look up the session for a set of credentials
    pub fn login(&self, email: &str, password: &str) -> Option<Account> {
        self.get_by_session_id(&Self::session_id_for(email, password))
    }

    // Get account by session ID
    pub fn get_by_session_id(&self, session_id: &str) -> Option<Account> {
        let accounts = self.accounts.lock().ok()?;
        accounts.get(session_id).cloned()
    }
}

fn save_accounts(path: &Path, accounts: &HashMap<String, Account>) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(accounts)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes)?;
    fs::rename(&staging, path)?;
    Ok(())
}
