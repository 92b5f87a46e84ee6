//! Progression engine for the PropQuest platform
//!
//! Tracks XP grants, derived levels, activity streaks, daily check-ins,
//! badges, and leaderboards in a SQLite database
//! (`~/.propquest/progression.db`).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │   HTTP API      │     │      CLI        │
//! │ (presentation)  │     │   (operators)   │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          └───────────┬───────────┘
//!                      ▼
//!             ProgressionManager
//!        ledger · streaks · daily claim
//!        badges · leaderboard · facade
//!                      ▼
//!          ~/.propquest/progression.db
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = ProgressionManager::new()?;
//! engine.ensure_user("u1")?;
//!
//! // Append a grant (updates total XP and level atomically)
//! engine.grant_xp("u1", ActionType::PropertySaved, 5, "saved a listing")?;
//!
//! // Claim today's bonus (at most once per calendar day)
//! let outcome = engine.claim_daily("u1", day_key::today_utc())?;
//! ```

pub mod badges;
mod daily;
pub mod day_key;
mod db;
mod error;
pub mod facade;
pub mod leaderboard;
mod ledger;
mod levels;
pub mod models;
mod streaks;

pub use daily::{ClaimPrompt, DailyPolicy, FileMarkerStore, MarkerStore, MemoryMarkerStore};
pub use db::ProgressionDb;
pub use error::{ProgressionError, Result};
pub use leaderboard::LeaderboardCategory;
pub use levels::{Level, LEVELS};
pub use streaks::MILESTONES;

use chrono::NaiveDate;

use badges::Badge;
use models::{
    ActionType, ClaimOutcome, DailyCheckin, LeaderboardEntry, LevelUp, ProfileView, StreakUpdate,
    UserBadge, UserStats, XpTransaction,
};

/// Central manager for the progression engine
///
/// The single entry point consumed by the HTTP API and the CLI. Every
/// state-changing operation runs as one SQLite transaction; reads are
/// lock-free snapshots (stale-by-seconds is acceptable for boards).
#[derive(Clone)]
pub struct ProgressionManager {
    db: ProgressionDb,
    daily_policy: DailyPolicy,
}

impl ProgressionManager {
    /// Create a manager with the default database location
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            db: ProgressionDb::open_default()?,
            daily_policy: DailyPolicy::default(),
        })
    }

    /// Create a manager with a custom database path
    pub fn with_path(path: &std::path::Path) -> anyhow::Result<Self> {
        Ok(Self {
            db: ProgressionDb::open(path)?,
            daily_policy: DailyPolicy::default(),
        })
    }

    /// In-memory manager for tests
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            db: ProgressionDb::open_in_memory()?,
            daily_policy: DailyPolicy::default(),
        })
    }

    /// Override the daily-bonus tuning (from config)
    pub fn with_daily_policy(mut self, policy: DailyPolicy) -> Self {
        self.daily_policy = policy;
        self
    }

    pub fn db(&self) -> &ProgressionDb {
        &self.db
    }

    /// Create the stats row for a user if this is their first visible
    /// action. Returns true when the row was created.
    pub fn ensure_user(&self, user_id: &str) -> Result<bool> {
        ledger::ensure_user(&self.db.conn(), user_id)
    }

    /// Current stats snapshot for a user
    pub fn stats(&self, user_id: &str) -> Result<UserStats> {
        ledger::load_stats(&self.db.conn(), user_id)
    }

    // ========================================
    // XP LEDGER
    // ========================================

    /// Append one XP grant (or penalty) and update the user's total and
    /// level atomically. Negative amounts clamp at zero total.
    pub fn grant_xp(
        &self,
        user_id: &str,
        action_type: ActionType,
        amount: i64,
        description: &str,
    ) -> Result<(XpTransaction, Option<LevelUp>)> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let result = ledger::grant_in_tx(&tx, user_id, action_type, amount, description)?;
        tx.commit()?;
        Ok(result)
    }

    /// A user's ledger entries, newest first
    pub fn transactions(&self, user_id: &str, limit: usize) -> Result<Vec<XpTransaction>> {
        ledger::transactions(&self.db.conn(), user_id, limit)
    }

    /// Check the reconciliation invariant: the sum of a user's ledger
    /// entries equals their stored total.
    pub fn reconcile(&self, user_id: &str) -> Result<bool> {
        let conn = self.db.conn();
        let stats = ledger::load_stats(&conn, user_id)?;
        Ok(ledger::ledger_sum(&conn, user_id)? == stats.total_xp)
    }

    // ========================================
    // STREAKS & DAILY CLAIM
    // ========================================

    /// Record a day of qualifying activity and pay any newly crossed
    /// streak milestone.
    pub fn record_activity(&self, user_id: &str, activity_day: NaiveDate) -> Result<StreakUpdate> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let update = streaks::record_activity_in_tx(&tx, user_id, activity_day)?;
        tx.commit()?;
        Ok(update)
    }

    /// Claim the daily bonus for `today`. Safe to call concurrently: the
    /// `(user_id, checkin_date)` insert decides the winner, losers get
    /// `already_claimed=true`.
    pub fn claim_daily(&self, user_id: &str, today: NaiveDate) -> Result<ClaimOutcome> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let outcome = daily::claim_in_tx(&tx, user_id, today, &self.daily_policy)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// The check-in row for a given day, if one exists
    pub fn checkin_for(&self, user_id: &str, day: NaiveDate) -> Result<Option<DailyCheckin>> {
        daily::checkin_for(&self.db.conn(), user_id, day)
    }

    // ========================================
    // BADGES
    // ========================================

    /// Evaluate all badge rules for a user, unlocking (and rewarding)
    /// any that newly hold. Idempotent across repeated calls.
    pub fn evaluate_badges(&self, user_id: &str) -> Result<Vec<&'static Badge>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let newly = badges::evaluate_in_tx(&tx, user_id)?;
        tx.commit()?;
        Ok(newly)
    }

    /// Badges a user has earned, oldest first
    pub fn earned_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"SELECT id, user_id, badge_key, earned_at FROM user_badges
               WHERE user_id = ?1 ORDER BY earned_at ASC, badge_key ASC"#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(UserBadge {
                id: row.get(0)?,
                user_id: row.get(1)?,
                badge_key: row.get(2)?,
                earned_at: row.get(3)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================
    // LEADERBOARD & PROFILE
    // ========================================

    /// Top entries for a category, plus deterministic tie-breaking
    pub fn leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        leaderboard::leaderboard(&self.db.conn(), category, limit)
    }

    /// The rank a user holds in a category (None when unranked)
    pub fn rank_for(&self, category: LeaderboardCategory, user_id: &str) -> Result<Option<u32>> {
        leaderboard::rank_for(&self.db.conn(), category, user_id)
    }

    /// Display-ready profile state: level, title, frame, progress bar,
    /// streaks, badge count. Pure derivation over the stats snapshot.
    pub fn profile(&self, user_id: &str) -> Result<ProfileView> {
        let conn = self.db.conn();
        let stats = ledger::load_stats(&conn, user_id)?;
        let badge_count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM user_badges WHERE user_id = ?1",
            [user_id],
            |r| r.get(0),
        )?;

        Ok(ProfileView {
            user_id: stats.user_id.clone(),
            total_xp: stats.total_xp,
            level: stats.current_level,
            title: facade::user_title(stats.current_level).to_string(),
            frame: facade::profile_frame(stats.current_level, stats.longest_streak),
            progress: facade::progress_to_next_level(stats.total_xp),
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            badge_count,
        })
    }

    // ========================================
    // MAINTENANCE
    // ========================================

    /// Delete all progression data
    pub fn reset_all(&self) -> anyhow::Result<()> {
        self.db.reset_all()
    }

    /// Delete one user's progression data
    pub fn reset_user(&self, user_id: &str) -> anyhow::Result<()> {
        self.db.reset_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manager_roundtrip() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        let engine = ProgressionManager::with_path(&db_path).unwrap();

        assert!(engine.ensure_user("u1").unwrap());
        assert!(!engine.ensure_user("u1").unwrap());

        let (tx, level_up) = engine
            .grant_xp("u1", ActionType::Login, 5, "daily login")
            .unwrap();
        assert_eq!(tx.xp_amount, 5);
        assert!(level_up.is_none());

        let today = day_key::parse_day("2025-03-09").unwrap();
        let outcome = engine.claim_daily("u1", today).unwrap();
        assert!(!outcome.already_claimed);
        assert_eq!(outcome.current_streak, 1);

        let profile = engine.profile("u1").unwrap();
        assert_eq!(profile.total_xp, 5 + outcome.xp_earned);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.title, "Newcomer");

        let board = engine.leaderboard(LeaderboardCategory::TopXp, 10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, "u1");
    }

    #[test]
    fn test_unknown_user_surfaces_not_found() {
        let engine = ProgressionManager::in_memory().unwrap();
        assert!(matches!(
            engine.profile("ghost"),
            Err(ProgressionError::NotFound(_))
        ));
        assert!(matches!(
            engine.grant_xp("ghost", ActionType::Login, 5, ""),
            Err(ProgressionError::NotFound(_))
        ));
    }
}
