use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{LedgerError, Result};
use crate::types::{Capital, Deposit, DepositStatus, Transaction, User};
use crate::users::{CodeGenerator, RandomCodes};

#[derive(Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub users: HashMap<String, User>,
    /// referral_code -> user id
    pub codes: HashMap<String, String>,
    pub capital: HashMap<String, Capital>,
    pub deposits: HashMap<u64, Deposit>,
    pub transactions: Vec<Transaction>,
    pub next_deposit_id: u64,
    pub next_transaction_id: u64,
}

impl Tables {
    fn empty() -> Self {
        Tables {
            next_deposit_id: 1,
            next_transaction_id: 1,
            ..Tables::default()
        }
    }
}

// Prior state of whatever a StoreTx touched, replayed in reverse on rollback
enum Undo {
    UserInserted(String),
    Capital { user_id: String, prev: Option<Capital> },
    Deposit { id: u64, prev: Option<Deposit> },
    TransactionAppended,
    NextDepositId(u64),
    NextTransactionId(u64),
}

/// Shared handle to the ledger database.
///
/// A store created with [`Store::open`] is backed by a JSON snapshot file that
/// is rewritten on every commit that changed something and read back on the
/// next open. [`Store::new`] keeps everything in memory.
#[derive(Clone)]
pub struct Store {
    tables: Arc<Mutex<Tables>>,
    snapshot: Option<PathBuf>,
    pub(crate) codes: Arc<dyn CodeGenerator>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_code_generator(Arc::new(RandomCodes))
    }

    pub fn with_code_generator(codes: Arc<dyn CodeGenerator>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::empty())),
            snapshot: None,
            codes,
        }
    }

    /// Opens the store persisted at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_code_generator(path, Arc::new(RandomCodes))
    }

    pub fn open_with_code_generator(
        path: impl Into<PathBuf>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Result<Self> {
        let path = path.into();
        let tables = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Tables>(&bytes).map_err(|e| {
                LedgerError::StorageFailure(format!("corrupt snapshot {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No ledger snapshot at {}, starting empty", path.display());
                Tables::empty()
            }
            Err(e) => return Err(io_failure(&path, e)),
        };
        tracing::info!(
            "Opened ledger at {} ({} users, {} deposits, {} transactions)",
            path.display(),
            tables.users.len(),
            tables.deposits.len(),
            tables.transactions.len()
        );

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            snapshot: Some(path),
            codes,
        })
    }

    /// Opens a unit of work. Holds the store lock until committed or dropped;
    /// dropping without `commit` undoes every write made through it.
    pub fn begin(&self) -> Result<StoreTx<'_>> {
        // A panicking unit of work has already been rolled back by its Drop
        let tables = self.tables.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Ledger lock poisoned by a panicked unit of work, recovering");
            self.tables.clear_poison();
            poisoned.into_inner()
        });
        Ok(StoreTx {
            tables,
            snapshot: self.snapshot.as_deref(),
            undo: Vec::new(),
            committed: false,
        })
    }

    /// Runs `f` inside a unit of work, committing only if it returns Ok
    pub fn transaction<T>(&self, f: impl FnOnce(&mut StoreTx<'_>) -> Result<T>) -> Result<T> {
        let mut tx = self.begin()?;
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn io_failure(path: &Path, e: io::Error) -> LedgerError {
    LedgerError::StorageFailure(format!("{}: {}", path.display(), e))
}

// Write-then-rename so a crash mid-write leaves the previous snapshot intact
fn write_snapshot(path: &Path, tables: &Tables) -> Result<()> {
    let bytes = serde_json::to_vec(tables)
        .map_err(|e| LedgerError::StorageFailure(format!("snapshot encoding failed: {}", e)))?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| io_failure(dir, e))?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).map_err(|e| io_failure(&staging, e))?;
    fs::rename(&staging, path).map_err(|e| io_failure(path, e))
}

pub struct StoreTx<'a> {
    tables: MutexGuard<'a, Tables>,
    snapshot: Option<&'a Path>,
    undo: Vec<Undo>,
    committed: bool,
}

impl StoreTx<'_> {
    /// Makes the writes permanent. If the snapshot cannot be written the
    /// writes are rolled back and the store keeps its previous state.
    pub fn commit(mut self) -> Result<()> {
        if let Some(path) = self.snapshot.filter(|_| !self.undo.is_empty()) {
            write_snapshot(path, &self.tables)?;
        }
        self.undo.clear();
        self.committed = true;
        Ok(())
    }

    fn rollback(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::UserInserted(id) => {
                    if let Some(user) = self.tables.users.remove(&id) {
                        self.tables.codes.remove(&user.referral_code);
                    }
                }
                Undo::Capital { user_id, prev } => match prev {
                    Some(capital) => {
                        self.tables.capital.insert(user_id, capital);
                    }
                    None => {
                        self.tables.capital.remove(&user_id);
                    }
                },
                Undo::Deposit { id, prev } => match prev {
                    Some(deposit) => {
                        self.tables.deposits.insert(id, deposit);
                    }
                    None => {
                        self.tables.deposits.remove(&id);
                    }
                },
                Undo::TransactionAppended => {
                    self.tables.transactions.pop();
                }
                Undo::NextDepositId(id) => self.tables.next_deposit_id = id,
                Undo::NextTransactionId(id) => self.tables.next_transaction_id = id,
            }
        }
    }

    // Users

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.tables.users.get(user_id)
    }

    pub fn user_by_code(&self, code: &str) -> Option<&User> {
        self.tables
            .codes
            .get(code)
            .and_then(|id| self.tables.users.get(id))
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    pub fn code_exists(&self, code: &str) -> bool {
        self.tables.codes.contains_key(code)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.tables.users.values()
    }

    /// Users whose `referred_by` equals `code`
    pub fn referred_by<'s>(&'s self, code: &'s str) -> impl Iterator<Item = &'s User> + 's {
        self.tables
            .users
            .values()
            .filter(move |user| user.referred_by.as_deref() == Some(code))
    }

    pub(crate) fn insert_user(&mut self, user: User) -> Result<()> {
        if self.tables.codes.contains_key(&user.referral_code) {
            return Err(LedgerError::DuplicateReferralCode);
        }
        self.tables
            .codes
            .insert(user.referral_code.clone(), user.id.clone());
        self.undo.push(Undo::UserInserted(user.id.clone()));
        self.tables.users.insert(user.id.clone(), user);
        Ok(())
    }

    // Capital

    pub fn capital(&self, user_id: &str) -> Option<&Capital> {
        self.tables.capital.get(user_id)
    }

    pub(crate) fn put_capital(&mut self, capital: Capital) {
        let prev = self
            .tables
            .capital
            .insert(capital.user_id.clone(), capital.clone());
        self.undo.push(Undo::Capital {
            user_id: capital.user_id,
            prev,
        });
    }

    // Deposits

    pub fn deposit(&self, id: u64) -> Option<&Deposit> {
        self.tables.deposits.get(&id)
    }

    pub fn deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.tables.deposits.values()
    }

    pub(crate) fn insert_deposit(
        &mut self,
        user_id: &str,
        amount: f64,
        wallet_address: Option<String>,
    ) -> Deposit {
        let id = self.tables.next_deposit_id;
        self.undo.push(Undo::NextDepositId(id));
        self.tables.next_deposit_id += 1;

        let now = Utc::now();
        let deposit = Deposit {
            id,
            user_id: user_id.to_string(),
            amount,
            wallet_address,
            status: DepositStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.undo.push(Undo::Deposit { id, prev: None });
        self.tables.deposits.insert(id, deposit.clone());
        deposit
    }

    /// Compare-and-set on the deposit status: succeeds only when the stored
    /// status equals `from`, so a deposit can leave Pending exactly once.
    pub(crate) fn transition_deposit(
        &mut self,
        id: u64,
        from: DepositStatus,
        to: DepositStatus,
        rejection_reason: Option<String>,
    ) -> Result<Deposit> {
        let deposit = self
            .tables
            .deposits
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound("Deposit", id.to_string()))?;
        if deposit.status != from {
            return Err(LedgerError::AlreadyProcessed(id));
        }

        let prev = deposit.clone();
        deposit.status = to;
        deposit.rejection_reason = rejection_reason;
        deposit.updated_at = Utc::now();
        let updated = deposit.clone();

        self.undo.push(Undo::Deposit {
            id,
            prev: Some(prev),
        });
        Ok(updated)
    }

    // Transactions

    pub fn transactions(&self) -> &[Transaction] {
        &self.tables.transactions
    }

    pub(crate) fn push_transaction(&mut self, mut transaction: Transaction) -> Transaction {
        let id = self.tables.next_transaction_id;
        self.undo.push(Undo::NextTransactionId(id));
        self.tables.next_transaction_id += 1;

        transaction.id = id;
        self.tables.transactions.push(transaction.clone());
        self.undo.push(Undo::TransactionAppended);
        transaction
    }
}

impl Drop for StoreTx<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.undo.is_empty() {
            tracing::warn!("Rolling back {} uncommitted ledger writes", self.undo.len());
            self.rollback();
        }
    }
}
