use serde::{Deserialize, Serialize};

/// Referral depth relative to the depositor, nearest first
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralLevel {
    One,
    Two,
    Three,
}

impl ReferralLevel {
    pub const ALL: [ReferralLevel; 3] =
        [ReferralLevel::One, ReferralLevel::Two, ReferralLevel::Three];

    /// Maps a 1-based chain position to a level, None past depth 3
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(ReferralLevel::One),
            2 => Some(ReferralLevel::Two),
            3 => Some(ReferralLevel::Three),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            ReferralLevel::One => 1,
            ReferralLevel::Two => 2,
            ReferralLevel::Three => 3,
        }
    }

    /// Flat percentage applied above the top tier
    pub fn percentage(self) -> f64 {
        match self {
            ReferralLevel::One => 7.0,
            ReferralLevel::Two => 2.0,
            ReferralLevel::Three => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReferralLevel::One => "EMP-1",
            ReferralLevel::Two => "EMP-2",
            ReferralLevel::Three => "EMP-3",
        }
    }
}

struct RewardTier {
    threshold: f64,
    emp1: f64,
    emp2: f64,
    emp3: f64,
}

impl RewardTier {
    fn value(&self, level: ReferralLevel) -> f64 {
        match level {
            ReferralLevel::One => self.emp1,
            ReferralLevel::Two => self.emp2,
            ReferralLevel::Three => self.emp3,
        }
    }
}

// Ascending by threshold
#[rustfmt::skip]
const REWARD_TIERS: [RewardTier; 6] = [
    RewardTier { threshold: 30.0, emp1: 2.10, emp2: 0.60, emp3: 0.30 },
    RewardTier { threshold: 50.0, emp1: 3.50, emp2: 1.00, emp3: 0.50 },
    RewardTier { threshold: 80.0, emp1: 5.60, emp2: 1.60, emp3: 0.80 },
    RewardTier { threshold: 100.0, emp1: 7.00, emp2: 2.00, emp3: 1.00 },
    RewardTier { threshold: 150.0, emp1: 10.50, emp2: 3.00, emp3: 1.50 },
    RewardTier { threshold: 200.0, emp1: 14.00, emp2: 4.00, emp3: 2.00 },
];

/// Commission owed to the upline member at `level` for a deposit of `amount`.
///
/// Amounts up to the top tier use the highest tier whose threshold is met
/// (zero below the first tier). Anything strictly above the top tier switches
/// to the flat percentage for the level; the table is never interpolated.
pub fn reward(amount: f64, level: ReferralLevel) -> f64 {
    let top = &REWARD_TIERS[REWARD_TIERS.len() - 1];
    if amount > top.threshold {
        return amount * level.percentage() / 100.0;
    }

    REWARD_TIERS
        .iter()
        .take_while(|tier| amount >= tier.threshold)
        .last()
        .map(|tier| tier.value(level))
        .unwrap_or(0.0)
}
