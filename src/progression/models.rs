//! Data models for the progression engine
//!
//! These structures represent the data stored in and derived from the
//! progression database. Everything handed to the presentation layer
//! derives `Serialize` so any front end can consume it as plain data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ProgressionError;

/// XP-granting (or penalizing) user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Plain sign-in, before any daily bonus
    Login,
    /// Once-per-day check-in bonus (guarded by `daily_checkins`)
    DailyBonus,
    /// Streak milestone payout (7-day, 30-day)
    StreakBonus,
    /// Badge unlock reward
    BadgeBonus,
    /// Searcher saved a property to their list
    PropertySaved,
    /// Searcher ran a property comparison
    PropertyCompared,
    /// Visitor submitted an investment/purchase inquiry
    InquirySubmitted,
    /// Agent answered an inquiry
    InquiryAnswered,
    /// Homeowner published a listing
    ListingCreated,
    /// User filled out their profile
    ProfileCompleted,
    /// Moderation penalty (negative amounts)
    Penalty,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::DailyBonus => "daily_bonus",
            Self::StreakBonus => "streak_bonus",
            Self::BadgeBonus => "badge_bonus",
            Self::PropertySaved => "property_saved",
            Self::PropertyCompared => "property_compared",
            Self::InquirySubmitted => "inquiry_submitted",
            Self::InquiryAnswered => "inquiry_answered",
            Self::ListingCreated => "listing_created",
            Self::ProfileCompleted => "profile_completed",
            Self::Penalty => "penalty",
        }
    }

    /// Parse from storage/API string. Unknown strings are a validation
    /// error at the boundary, not a panic.
    pub fn parse(s: &str) -> Result<Self, ProgressionError> {
        match s {
            "login" => Ok(Self::Login),
            "daily_bonus" => Ok(Self::DailyBonus),
            "streak_bonus" => Ok(Self::StreakBonus),
            "badge_bonus" => Ok(Self::BadgeBonus),
            "property_saved" => Ok(Self::PropertySaved),
            "property_compared" => Ok(Self::PropertyCompared),
            "inquiry_submitted" => Ok(Self::InquirySubmitted),
            "inquiry_answered" => Ok(Self::InquiryAnswered),
            "listing_created" => Ok(Self::ListingCreated),
            "profile_completed" => Ok(Self::ProfileCompleted),
            "penalty" => Ok(Self::Penalty),
            other => Err(ProgressionError::validation(format!(
                "unknown action type: {other}"
            ))),
        }
    }
}

/// Per-user progression stats (one row per user, mutated only by the
/// engine's transactional event processing)
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_xp: i64,
    /// Always derived from `total_xp` via the level table, never set
    /// independently
    pub current_level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_day: Option<NaiveDate>,
    /// Day the current unbroken streak started (anchors milestone payouts)
    pub streak_started_day: Option<NaiveDate>,
    /// Account creation, ms since epoch - the leaderboard tie-breaker
    pub created_at: i64,
}

/// One append-only ledger entry. The sum of a user's `xp_amount`s equals
/// their `total_xp` (amounts are recorded post-clamping).
#[derive(Debug, Clone, Serialize)]
pub struct XpTransaction {
    pub id: String,
    pub user_id: String,
    pub action_type: ActionType,
    pub xp_amount: i64,
    pub description: String,
    pub created_at: i64,
}

/// A level-up observed while applying a grant
#[derive(Debug, Clone, Serialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
    pub new_title: String,
}

/// Result of recording a day of activity
#[derive(Debug, Clone, Serialize)]
pub struct StreakUpdate {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Milestone XP paid out by this update (0 when no threshold was
    /// newly crossed)
    pub milestone_xp: i64,
}

/// One daily check-in row (at most one per user per calendar day)
#[derive(Debug, Clone, Serialize)]
pub struct DailyCheckin {
    pub user_id: String,
    pub checkin_date: NaiveDate,
    pub xp_earned: i64,
    pub streak_bonus: i64,
    pub created_at: i64,
}

/// Result of a daily-bonus claim. `already_claimed` is a success state:
/// a concurrent claim from another device/tab won the insert.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub xp_earned: i64,
    pub streak_bonus: i64,
    pub current_streak: u32,
    pub already_claimed: bool,
}

/// A badge held by a user
#[derive(Debug, Clone, Serialize)]
pub struct UserBadge {
    pub id: String,
    pub user_id: String,
    pub badge_key: String,
    pub earned_at: i64,
}

/// One leaderboard row (derived view, never the system of record)
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub rank: u32,
    pub score: i64,
    pub level: u32,
    pub badge_count: u32,
}

/// Progress toward the next level, clamped to 100% at max level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    /// XP accumulated within the current level
    pub current: i64,
    /// XP needed to go from the current level to the next
    pub required: i64,
    pub percentage: f32,
}

/// Display-ready profile state for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: String,
    pub total_xp: i64,
    pub level: u32,
    pub title: String,
    pub frame: super::facade::ProfileFrame,
    pub progress: LevelProgress,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub badge_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for action in [
            ActionType::Login,
            ActionType::DailyBonus,
            ActionType::StreakBonus,
            ActionType::BadgeBonus,
            ActionType::PropertySaved,
            ActionType::PropertyCompared,
            ActionType::InquirySubmitted,
            ActionType::InquiryAnswered,
            ActionType::ListingCreated,
            ActionType::ProfileCompleted,
            ActionType::Penalty,
        ] {
            assert_eq!(ActionType::parse(action.as_str()).unwrap(), action);
        }
    }

    #[test]
    fn test_action_type_rejects_unknown() {
        assert!(ActionType::parse("teleport").is_err());
        assert!(ActionType::parse("").is_err());
    }
}
