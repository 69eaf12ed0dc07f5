use crate::error::{LedgerError, Result};
use crate::store::{Store, StoreTx};
use crate::types::{ReferralInfo, ReferralTeam, User};

/// Deepest upline level that earns commission
pub const MAX_REFERRAL_DEPTH: usize = 3;

impl StoreTx<'_> {
    /// Up to three ancestor referrers of `user_id`, nearest first.
    ///
    /// Each hop follows `referred_by` to the user owning that code. A missing
    /// `referred_by` or a code nobody owns ends the chain early; that is a
    /// normal outcome, not an error.
    pub fn resolve_upline(&self, user_id: &str) -> Vec<User> {
        let mut chain = Vec::with_capacity(MAX_REFERRAL_DEPTH);
        let mut next_code = self.user(user_id).and_then(|u| u.referred_by.clone());

        while chain.len() < MAX_REFERRAL_DEPTH {
            let Some(code) = next_code else {
                break;
            };
            let Some(referrer) = self.user_by_code(&code) else {
                tracing::warn!(
                    "Referral code {} in the upline of {} belongs to no user",
                    code,
                    user_id
                );
                break;
            };
            // A self-referential code would otherwise pay the same user repeatedly
            if referrer.id == user_id || chain.iter().any(|u: &User| u.id == referrer.id) {
                tracing::warn!("Referral cycle detected in the upline of {}", user_id);
                break;
            }

            tracing::debug!(
                "Upline level {} of {} is {}",
                chain.len() + 1,
                user_id,
                referrer.id
            );
            next_code = referrer.referred_by.clone();
            chain.push(referrer.clone());
        }

        chain
    }

    /// Downline head-counts for the three levels below `user_id`
    pub fn referral_team(&self, user_id: &str) -> ReferralTeam {
        let Some(user) = self.user(user_id) else {
            return ReferralTeam::default();
        };

        let mut counts = [0usize; MAX_REFERRAL_DEPTH];
        let mut frontier = vec![user.referral_code.clone()];
        for count in counts.iter_mut() {
            let next: Vec<String> = frontier
                .iter()
                .flat_map(|code| self.referred_by(code))
                .map(|u| u.referral_code.clone())
                .collect();
            *count = next.len();
            frontier = next;
        }

        ReferralTeam {
            level1: counts[0],
            level2: counts[1],
            level3: counts[2],
            total: counts.iter().sum(),
        }
    }
}

impl Store {
    pub fn referral_info(&self, user_id: &str, frontend_url: &str) -> Result<ReferralInfo> {
        let tx = self.begin()?;
        let user = tx
            .user(user_id)
            .ok_or_else(|| LedgerError::NotFound("User", user_id.to_string()))?;

        Ok(ReferralInfo {
            referral_code: user.referral_code.clone(),
            referral_link: format!(
                "{}/register?ref={}",
                frontend_url.trim_end_matches('/'),
                user.referral_code
            ),
        })
    }

    pub fn referral_team(&self, user_id: &str) -> Result<ReferralTeam> {
        Ok(self.begin()?.referral_team(user_id))
    }

    pub fn upline(&self, user_id: &str) -> Result<Vec<User>> {
        Ok(self.begin()?.resolve_upline(user_id))
    }
}
