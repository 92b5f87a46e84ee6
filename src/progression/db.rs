//! SQLite connection and schema management for the progression engine
//!
//! Manages the `~/.propquest/progression.db` database with automatic
//! schema migration. The schema carries the engine's hard invariants:
//! `daily_checkins` is keyed on `(user_id, checkin_date)` - the sole
//! authoritative guard for at-most-once daily claims - and
//! `user_badges(user_id, badge_key)` / `streak_milestones(user_id,
//! streak_started_day, milestone)` make badge unlocks and milestone
//! payouts exactly-once.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::Config;

/// Database wrapper shared by the manager and its sub-components
#[derive(Clone)]
pub struct ProgressionDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ProgressionDb {
    /// Open or create the database at the default location
    /// (~/.propquest/progression.db)
    pub fn open_default() -> Result<Self> {
        let db_path = Config::global_data_dir().join("progression.db");
        Self::open(&db_path)
    }

    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progression db: {}", path.display()))?;

        // WAL for concurrent readers while a claim/grant is in flight
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a guard on the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Progression DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: track the start day of the current unbroken streak
        // (anchors exactly-once milestone payouts)
        if version < 2 {
            let has_column: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('user_stats') WHERE name = 'streak_started_day'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_column {
                conn.execute_batch(
                    r#"
                    ALTER TABLE user_stats ADD COLUMN streak_started_day TEXT;

                    CREATE TABLE IF NOT EXISTS streak_milestones (
                        user_id TEXT NOT NULL,
                        streak_started_day TEXT NOT NULL,
                        milestone INTEGER NOT NULL,
                        awarded_at INTEGER NOT NULL,
                        PRIMARY KEY (user_id, streak_started_day, milestone)
                    );
                    "#,
                )?;
            }

            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }

    /// Delete every row for one user (support/GDPR path)
    pub fn reset_user(&self, user_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM xp_transactions WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM user_badges WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM daily_checkins WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM streak_milestones WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM user_stats WHERE user_id = ?1", [user_id])?;
        Ok(())
    }

    /// Delete all progression data
    pub fn reset_all(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            DELETE FROM xp_transactions;
            DELETE FROM user_badges;
            DELETE FROM daily_checkins;
            DELETE FROM streak_milestones;
            DELETE FROM user_stats;
            "#,
        )?;
        Ok(())
    }
}

/// SQL schema for the progression database
const SCHEMA_SQL: &str = r#"
-- Per-user progression state (level is always derived from total_xp)
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY,
    total_xp INTEGER NOT NULL DEFAULT 0 CHECK (total_xp >= 0),
    current_level INTEGER NOT NULL DEFAULT 1,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_day TEXT,
    streak_started_day TEXT,
    created_at INTEGER NOT NULL
);

-- Append-only XP ledger; amounts are stored post-clamping so the per-user
-- sum always reconciles with user_stats.total_xp
CREATE TABLE IF NOT EXISTS xp_transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    xp_amount INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_xp_user ON xp_transactions(user_id);
CREATE INDEX IF NOT EXISTS idx_xp_user_action ON xp_transactions(user_id, action_type);

-- Earned badges, exactly one row per (user, badge)
CREATE TABLE IF NOT EXISTS user_badges (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    badge_key TEXT NOT NULL,
    earned_at INTEGER NOT NULL,
    UNIQUE (user_id, badge_key)
);
CREATE INDEX IF NOT EXISTS idx_badges_user ON user_badges(user_id);

-- Daily check-ins; the primary key is the idempotency anchor for the
-- daily bonus (all other caches are advisory)
CREATE TABLE IF NOT EXISTS daily_checkins (
    user_id TEXT NOT NULL,
    checkin_date TEXT NOT NULL,
    xp_earned INTEGER NOT NULL DEFAULT 0,
    streak_bonus INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, checkin_date)
);

-- Milestones already paid for a given unbroken streak
CREATE TABLE IF NOT EXISTS streak_milestones (
    user_id TEXT NOT NULL,
    streak_started_day TEXT NOT NULL,
    milestone INTEGER NOT NULL,
    awarded_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, streak_started_day, milestone)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (2);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        let db = ProgressionDb::open(&db_path).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"user_stats".to_string()));
        assert!(tables.contains(&"xp_transactions".to_string()));
        assert!(tables.contains(&"user_badges".to_string()));
        assert!(tables.contains(&"daily_checkins".to_string()));
        assert!(tables.contains(&"streak_milestones".to_string()));
    }

    #[test]
    fn test_checkin_primary_key_rejects_second_insert() {
        let db = ProgressionDb::open_in_memory().unwrap();
        let conn = db.conn();
        conn.execute(
            "INSERT INTO daily_checkins (user_id, checkin_date, xp_earned, streak_bonus, created_at) VALUES ('u1', '2025-03-09', 5, 0, 0)",
            [],
        )
        .unwrap();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO daily_checkins (user_id, checkin_date, xp_earned, streak_bonus, created_at) VALUES ('u1', '2025-03-09', 5, 0, 0)",
                [],
            )
            .unwrap();
        assert_eq!(changed, 0);
    }
}
