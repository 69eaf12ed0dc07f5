use axum::{extract::State, http::StatusCode};
use ledger::types::{ReferralInfo, ReferralTeam};

use super::{ApiResult, from_ledger_error, ok};
use crate::{AppState, middleware::AuthUser};

// Invite code and shareable registration link
pub async fn referral_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<ReferralInfo> {
    match state
        .store
        .referral_info(&user.user_id, &state.config.frontend_url)
    {
        Ok(info) => ok(StatusCode::OK, "Referral info retrieved", info),
        Err(e) => from_ledger_error(e),
    }
}

// Head-counts of the caller's three downline levels
pub async fn referral_team(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<ReferralTeam> {
    match state.store.referral_team(&user.user_id) {
        Ok(team) => ok(StatusCode::OK, "Referral team retrieved", team),
        Err(e) => from_ledger_error(e),
    }
}
