//! Consecutive-day activity streaks with exactly-once milestone bonuses
//!
//! A streak is a run of consecutive calendar days with qualifying
//! activity. Milestone bonuses (7 days, 30 days) are paid once per
//! unbroken run, anchored on the run's starting day: the
//! `streak_milestones` insert is keyed `(user_id, streak_started_day,
//! milestone)`, so re-evaluating the same day pays nothing, while a new
//! run that crosses a milestone again pays again.

use chrono::{Days, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::day_key;
use super::error::Result;
use super::ledger;
use super::models::{ActionType, StreakUpdate};

/// Streak milestones: (day threshold, bonus XP)
pub const MILESTONES: &[(u32, i64)] = &[(7, 25), (30, 100)];

/// Record a day of qualifying activity inside an open transaction.
///
/// Same-day repeats are no-ops; the day after the last activity extends
/// the streak; any longer gap resets it to 1. `longest_streak` never
/// decreases. Days earlier than the recorded last activity are ignored
/// (an out-of-order replay, not a reset).
pub(crate) fn record_activity_in_tx(
    conn: &Connection,
    user_id: &str,
    activity_day: NaiveDate,
) -> Result<StreakUpdate> {
    let stats = ledger::load_stats(conn, user_id)?;

    let (current, started) = match stats.last_activity_day {
        Some(last) if activity_day == last => {
            return Ok(StreakUpdate {
                current_streak: stats.current_streak,
                longest_streak: stats.longest_streak,
                milestone_xp: 0,
            });
        }
        Some(last) if activity_day < last => {
            warn!(
                user_id,
                activity_day = %activity_day,
                last_activity_day = %last,
                "ignoring out-of-order activity day"
            );
            return Ok(StreakUpdate {
                current_streak: stats.current_streak,
                longest_streak: stats.longest_streak,
                milestone_xp: 0,
            });
        }
        Some(last) if Some(activity_day) == last.checked_add_days(Days::new(1)) => {
            let current = stats.current_streak + 1;
            let started = stats
                .streak_started_day
                .or_else(|| activity_day.checked_sub_days(Days::new(u64::from(current) - 1)))
                .unwrap_or(activity_day);
            (current, started)
        }
        // Gap, or first-ever activity
        _ => (1, activity_day),
    };

    let longest = current.max(stats.longest_streak);
    debug!(user_id, current, longest, "streak updated");

    conn.execute(
        r#"UPDATE user_stats
           SET current_streak = ?1, longest_streak = ?2,
               last_activity_day = ?3, streak_started_day = ?4
           WHERE user_id = ?5"#,
        rusqlite::params![
            current,
            longest,
            day_key::format_day(activity_day),
            day_key::format_day(started),
            user_id,
        ],
    )?;

    let milestone_xp = pay_milestones_in_tx(conn, user_id, current, started)?;

    Ok(StreakUpdate {
        current_streak: current,
        longest_streak: longest,
        milestone_xp,
    })
}

/// Pay any newly crossed milestone for the current run. The insert-or-
/// ignore on `(user_id, streak_started_day, milestone)` decides whether
/// the bonus has been paid before; the grant only happens when the row
/// was actually inserted.
fn pay_milestones_in_tx(
    conn: &Connection,
    user_id: &str,
    current_streak: u32,
    streak_started: NaiveDate,
) -> Result<i64> {
    let now = Utc::now().timestamp_millis();
    let started_key = day_key::format_day(streak_started);
    let mut paid = 0i64;

    for &(threshold, bonus) in MILESTONES {
        if current_streak < threshold {
            continue;
        }
        let inserted = conn.execute(
            r#"INSERT OR IGNORE INTO streak_milestones (user_id, streak_started_day, milestone, awarded_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            rusqlite::params![user_id, started_key, threshold, now],
        )?;
        if inserted > 0 {
            ledger::grant_in_tx(
                conn,
                user_id,
                ActionType::StreakBonus,
                bonus,
                &format!("{threshold}-day streak bonus"),
            )?;
            paid += bonus;
        }
    }

    Ok(paid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::db::ProgressionDb;

    fn day(s: &str) -> NaiveDate {
        day_key::parse_day(s).unwrap()
    }

    fn setup() -> ProgressionDb {
        let db = ProgressionDb::open_in_memory().unwrap();
        ledger::ensure_user(&db.conn(), "u1").unwrap();
        db
    }

    #[test]
    fn test_first_activity_starts_at_one() {
        let db = setup();
        let conn = db.conn();
        let update = record_activity_in_tx(&conn, "u1", day("2025-03-01")).unwrap();
        assert_eq!(update.current_streak, 1);
        assert_eq!(update.longest_streak, 1);
        assert_eq!(update.milestone_xp, 0);
    }

    #[test]
    fn test_same_day_is_noop() {
        let db = setup();
        let conn = db.conn();
        record_activity_in_tx(&conn, "u1", day("2025-03-01")).unwrap();
        let update = record_activity_in_tx(&conn, "u1", day("2025-03-01")).unwrap();
        assert_eq!(update.current_streak, 1);
        let stats = ledger::load_stats(&conn, "u1").unwrap();
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn test_next_day_extends_and_gap_resets() {
        let db = setup();
        let conn = db.conn();
        record_activity_in_tx(&conn, "u1", day("2025-03-01")).unwrap();
        let update = record_activity_in_tx(&conn, "u1", day("2025-03-02")).unwrap();
        assert_eq!(update.current_streak, 2);

        // Three-day gap resets to 1, longest survives
        let update = record_activity_in_tx(&conn, "u1", day("2025-03-05")).unwrap();
        assert_eq!(update.current_streak, 1);
        assert_eq!(update.longest_streak, 2);
    }

    #[test]
    fn test_out_of_order_day_is_ignored() {
        let db = setup();
        let conn = db.conn();
        record_activity_in_tx(&conn, "u1", day("2025-03-05")).unwrap();
        let update = record_activity_in_tx(&conn, "u1", day("2025-03-02")).unwrap();
        assert_eq!(update.current_streak, 1);
        let stats = ledger::load_stats(&conn, "u1").unwrap();
        assert_eq!(stats.last_activity_day, Some(day("2025-03-05")));
    }

    #[test]
    fn test_seven_day_milestone_paid_once() {
        let db = setup();
        let conn = db.conn();
        let mut d = day("2025-03-01");
        let mut last = StreakUpdate {
            current_streak: 0,
            longest_streak: 0,
            milestone_xp: 0,
        };
        for _ in 0..7 {
            last = record_activity_in_tx(&conn, "u1", d).unwrap();
            d = d.succ_opt().unwrap();
        }
        assert_eq!(last.current_streak, 7);
        assert_eq!(last.milestone_xp, 25);

        // Day 8: at-or-above the threshold, but already paid
        let update = record_activity_in_tx(&conn, "u1", d).unwrap();
        assert_eq!(update.current_streak, 8);
        assert_eq!(update.milestone_xp, 0);
        assert_eq!(ledger::ledger_sum(&conn, "u1").unwrap(), 25);
    }

    #[test]
    fn test_milestone_pays_again_after_reset() {
        let db = setup();
        let conn = db.conn();
        let mut d = day("2025-03-01");
        for _ in 0..7 {
            record_activity_in_tx(&conn, "u1", d).unwrap();
            d = d.succ_opt().unwrap();
        }

        // Break the streak, then build a fresh 7-day run
        let mut d = day("2025-04-01");
        let mut last_xp = 0;
        for _ in 0..7 {
            last_xp = record_activity_in_tx(&conn, "u1", d).unwrap().milestone_xp;
            d = d.succ_opt().unwrap();
        }
        assert_eq!(last_xp, 25);
        assert_eq!(ledger::ledger_sum(&conn, "u1").unwrap(), 50);
    }

    #[test]
    fn test_thirty_day_milestone() {
        let db = setup();
        let conn = db.conn();
        let mut d = day("2025-03-01");
        let mut total_milestones = 0i64;
        for _ in 0..30 {
            total_milestones += record_activity_in_tx(&conn, "u1", d).unwrap().milestone_xp;
            d = d.succ_opt().unwrap();
        }
        // 7-day (+25) and 30-day (+100), each exactly once
        assert_eq!(total_milestones, 125);
    }
}
