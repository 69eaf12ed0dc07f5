use anyhow::Context;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 6957;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_LEDGER_PATH: &str = "data/ledger.json";
const DEFAULT_SESSIONS_PATH: &str = "data/sessions.json";

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// Base for referral links handed to users
    pub frontend_url: String,
    /// Snapshot file the ledger is loaded from and saved to
    pub ledger_path: PathBuf,
    pub sessions_path: PathBuf,
    pub admin: Option<AdminCredentials>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", port))?,
            None => DEFAULT_PORT,
        };

        let admin = match (get("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !password.is_empty() => Some(AdminCredentials {
                email: email.to_lowercase(),
                password,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            ledger_path: get("LEDGER_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string())
                .into(),
            sessions_path: get("SESSIONS_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_SESSIONS_PATH.to_string())
                .into(),
            admin,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
