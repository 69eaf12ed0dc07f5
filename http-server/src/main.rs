use axum::{
    Router,
    routing::{any, get, post},
};
use ledger::{LedgerError, Store, types::Role};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod middleware;
mod models;
mod routes;
mod websocket;

use config::Config;
use models::SessionStore;
use routes::{admin, deposits, referral, users, withdrawals};
use websocket::{NotificationManager, create_notification_manager, websocket_handler};

// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: SessionStore,
    pub notification_manager: NotificationManager,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = Store::open(&config.ledger_path)?;
    let sessions = SessionStore::open(&config.sessions_path)?;

    bootstrap_admin(&config, &store, &sessions)?;

    let listen_addr = config.listen_addr();
    let state = AppState {
        store,
        sessions,
        notification_manager: create_notification_manager(),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/profile", get(users::get_profile))
        .route("/capital", get(users::get_capital))
        .route(
            "/deposits",
            post(deposits::create_deposit).get(deposits::deposit_history),
        )
        .route(
            "/withdrawals",
            post(withdrawals::create_withdrawal).get(withdrawals::withdrawal_history),
        )
        .route("/referral/info", get(referral::referral_info))
        .route("/referral/team", get(referral::referral_team))
        .route("/admin/deposits", get(admin::list_deposits))
        .route("/admin/deposits/{id}/approve", post(admin::approve_deposit))
        .route("/admin/deposits/{id}/reject", post(admin::reject_deposit))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/balance", post(admin::update_balance))
        .route("/admin/users/{id}/reset", post(admin::reset_user_account))
        .route("/admin/users/{id}/capital", post(admin::set_user_capital))
        .route("/admin/users/{id}/transactions", get(admin::user_transactions))
        .route("/notifications", any(websocket_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Server running on http://{}", listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// Register the configured admin and give it a session
fn bootstrap_admin(config: &Config, store: &Store, sessions: &SessionStore) -> anyhow::Result<()> {
    let Some(admin) = &config.admin else {
        tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, admin endpoints are unreachable");
        return Ok(());
    };

    let user = match store.register("admin", &admin.email, None, Role::Admin) {
        Ok(user) => user,
        Err(LedgerError::AlreadyRegistered(_)) => store
            .find_user_by_email(&admin.email)?
            .ok_or_else(|| anyhow::anyhow!("admin user vanished during bootstrap"))?,
        Err(e) => return Err(e.into()),
    };
    sessions
        .create_session(&admin.password, &user)
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Admin account {} ready", admin.email);
    Ok(())
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// Root endpoint
async fn root() -> &'static str {
    "Brokerage Ledger API - POST /register or /login to authenticate, POST /deposits and /withdrawals to move capital, GET /referral/team for your downline, WebSocket /notifications for real-time updates"
}
