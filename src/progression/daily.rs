//! Daily Claim Guard - at-most-once daily bonus per user per calendar day
//!
//! Three layers know about "claimed today": the durable `daily_checkins`
//! row, a local file-backed marker cache, and session-scoped flags that
//! suppress duplicate prompts. Only the durable row is authoritative; the
//! rest are advisory hints with a fixed precedence (see
//! `ClaimPrompt::should_prompt`). The claim itself wins or loses on the
//! `(user_id, checkin_date)` insert - a lost race is reported as
//! `already_claimed`, not an error.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::day_key;
use super::error::{ProgressionError, Result};
use super::ledger;
use super::models::{ActionType, ClaimOutcome, DailyCheckin};
use super::streaks;

/// Tuning for the daily bonus grant
#[derive(Debug, Clone, Copy)]
pub struct DailyPolicy {
    /// Flat XP for checking in
    pub base_xp: i64,
    /// Extra XP per streak day beyond the first
    pub streak_step: i64,
    /// Ceiling on the streak extra
    pub streak_cap: i64,
}

impl Default for DailyPolicy {
    fn default() -> Self {
        Self {
            base_xp: 5,
            streak_step: 2,
            streak_cap: 20,
        }
    }
}

impl DailyPolicy {
    /// Streak extra for a given post-claim streak. A one-day streak earns
    /// only the base amount.
    pub fn streak_bonus(&self, current_streak: u32) -> i64 {
        (i64::from(current_streak.saturating_sub(1)) * self.streak_step).min(self.streak_cap)
    }
}

/// Claim the daily bonus inside an open transaction.
///
/// The insert into `daily_checkins` happens first: zero rows changed
/// means another device or tab already claimed this day, and the call
/// returns `already_claimed=true` without touching streaks or the
/// ledger. A successful insert is followed by the activity/streak update
/// and the bonus grant, then the check-in row is filled with the amounts
/// actually granted.
pub(crate) fn claim_in_tx(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
    policy: &DailyPolicy,
) -> Result<ClaimOutcome> {
    let stats = ledger::load_stats(conn, user_id)?;
    let date_key = day_key::format_day(today);
    let now = Utc::now().timestamp_millis();

    let inserted = conn.execute(
        r#"INSERT OR IGNORE INTO daily_checkins (user_id, checkin_date, xp_earned, streak_bonus, created_at)
           VALUES (?1, ?2, 0, 0, ?3)"#,
        rusqlite::params![user_id, date_key, now],
    )?;
    if inserted == 0 {
        debug!(user_id, date = %date_key, "daily claim lost the insert race");
        return Ok(ClaimOutcome {
            xp_earned: 0,
            streak_bonus: 0,
            current_streak: stats.current_streak,
            already_claimed: true,
        });
    }

    // The claim counts as the day's qualifying activity, so the bonus
    // scales with the post-claim streak.
    let streak = streaks::record_activity_in_tx(conn, user_id, today)?;
    let streak_bonus = policy.streak_bonus(streak.current_streak);
    let xp_earned = policy.base_xp + streak_bonus;

    ledger::grant_in_tx(
        conn,
        user_id,
        ActionType::DailyBonus,
        xp_earned,
        &format!("daily check-in ({date_key})"),
    )?;

    conn.execute(
        "UPDATE daily_checkins SET xp_earned = ?1, streak_bonus = ?2 WHERE user_id = ?3 AND checkin_date = ?4",
        rusqlite::params![xp_earned, streak_bonus, user_id, date_key],
    )?;

    info!(
        user_id,
        date = %date_key,
        xp_earned,
        streak = streak.current_streak,
        "daily bonus claimed"
    );

    Ok(ClaimOutcome {
        xp_earned,
        streak_bonus,
        current_streak: streak.current_streak,
        already_claimed: false,
    })
}

/// Fetch the check-in row for a given day, if any.
pub(crate) fn checkin_for(
    conn: &Connection,
    user_id: &str,
    day: NaiveDate,
) -> Result<Option<DailyCheckin>> {
    let row = conn
        .query_row(
            r#"SELECT user_id, checkin_date, xp_earned, streak_bonus, created_at
               FROM daily_checkins WHERE user_id = ?1 AND checkin_date = ?2"#,
            rusqlite::params![user_id, day_key::format_day(day)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    Ok(row.and_then(|(user_id, date, xp_earned, streak_bonus, created_at)| {
        Some(DailyCheckin {
            user_id,
            checkin_date: day_key::parse_day(&date)?,
            xp_earned,
            streak_bonus,
            created_at,
        })
    }))
}

// ============================================================
// Advisory marker layer
// ============================================================

/// Key-value store for advisory "claimed"/"dismissed" markers. Never
/// authoritative: a miss means "ask the durable store", an error means
/// the layer is unavailable and the prompt fails closed.
pub trait MarkerStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Marker store persisted as a small JSON map on disk
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the PropQuest data dir
    pub fn open_default() -> Self {
        Self::new(crate::config::Config::global_data_dir().join("claim_markers.json"))
    }

    fn unavailable(&self, source: std::io::Error) -> ProgressionError {
        ProgressionError::StorageUnavailable {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.unavailable(e)),
        }
    }

    fn save(&self, markers: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
        }
        let content = serde_json::to_string_pretty(markers)?;
        std::fs::write(&self.path, content).map_err(|e| self.unavailable(e))
    }
}

impl MarkerStore for FileMarkerStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut markers = self.load()?;
        markers.insert(key.to_string(), value.to_string());
        self.save(&markers)
    }
}

/// In-memory marker store (session scope, and the test double)
#[derive(Default)]
pub struct MemoryMarkerStore {
    map: BTreeMap<String, String>,
}

impl MarkerStore for MemoryMarkerStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Decides whether the daily-bonus prompt should be shown.
///
/// Precedence, most binding first:
/// 1. local marker store unavailable -> suppress (fail closed, otherwise
///    the prompt would reappear on every load);
/// 2. dismissed today (local marker) or this session -> suppress;
/// 3. already shown this session -> suppress;
/// 4. local "claimed" marker for today -> suppress (fast path);
/// 5. durable check-in row for today -> suppress and backfill the local
///    marker;
/// 6. otherwise prompt - eligibility is re-verified by the insert at
///    claim time.
pub struct ClaimPrompt<S: MarkerStore> {
    local: S,
    shown_this_session: HashSet<String>,
    dismissed_this_session: HashSet<String>,
}

impl<S: MarkerStore> ClaimPrompt<S> {
    pub fn new(local: S) -> Self {
        Self {
            local,
            shown_this_session: HashSet::new(),
            dismissed_this_session: HashSet::new(),
        }
    }

    /// Whether to surface the prompt for `user_id` on `today`.
    ///
    /// Durable-store errors propagate (the caller may retry); they are
    /// never read as "already claimed". Only advisory-layer failures
    /// fail closed.
    pub fn should_prompt(
        &mut self,
        conn: &Connection,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<bool> {
        let claimed_key = day_key::claimed_key(user_id, today);
        let dismissed_key = day_key::dismissed_key(user_id, today);

        // 1. Probe the local layer; unavailable means suppress.
        let local_claimed = match self.local.get(&claimed_key) {
            Ok(v) => v,
            Err(ProgressionError::StorageUnavailable { ref path, .. }) => {
                warn!(path = %path.display(), "marker store unavailable, suppressing prompt");
                return Ok(false);
            }
            Err(ProgressionError::CorruptMarkers(e)) => {
                warn!(error = %e, "corrupt marker file, suppressing prompt");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        // 2. Explicit deferral wins over everything below.
        if self.dismissed_this_session.contains(user_id)
            || self.local.get(&dismissed_key).unwrap_or(None).is_some()
        {
            return Ok(false);
        }

        // 3. One prompt per continuous session, even before the durable
        // check has round-tripped.
        if self.shown_this_session.contains(user_id) {
            return Ok(false);
        }

        // 4. Fast path: the local cache already knows about today.
        if local_claimed.is_some() {
            return Ok(false);
        }

        // 5. Durable truth, with backfill.
        if checkin_for(conn, user_id, today)?.is_some() {
            if let Err(e) = self.local.set(&claimed_key, "1") {
                debug!(error = %e, "could not backfill claim marker");
            }
            return Ok(false);
        }

        Ok(true)
    }

    /// Record that the prompt was rendered this session.
    pub fn mark_shown(&mut self, user_id: &str) {
        self.shown_this_session.insert(user_id.to_string());
    }

    /// User explicitly deferred; do not re-prompt today or this session.
    pub fn dismiss(&mut self, user_id: &str, today: NaiveDate) {
        self.dismissed_this_session.insert(user_id.to_string());
        if let Err(e) = self.local.set(&day_key::dismissed_key(user_id, today), "1") {
            debug!(error = %e, "could not persist dismissal marker");
        }
    }

    /// Record a successful claim in the local cache.
    pub fn note_claimed(&mut self, user_id: &str, today: NaiveDate) {
        if let Err(e) = self.local.set(&day_key::claimed_key(user_id, today), "1") {
            debug!(error = %e, "could not persist claim marker");
        }
    }
}
