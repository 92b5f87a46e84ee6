//! Badge unlock evaluation
//!
//! Runs after any state-changing action. Already-earned badges
//! short-circuit; a rule newly evaluating true creates the `user_badges`
//! row and grants the badge's XP reward in the same transaction, keyed
//! on the row actually being inserted - repeated evaluation (or a retry
//! of an abandoned call) can never double-grant.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use super::definitions::{Badge, BadgeRule, StatKind, BADGES};
use crate::progression::error::Result;
use crate::progression::ledger;
use crate::progression::models::{ActionType, UserStats};

/// Evaluate all catalog rules for a user inside an open transaction,
/// returning the badges newly unlocked by this call.
pub(crate) fn evaluate_in_tx(conn: &Connection, user_id: &str) -> Result<Vec<&'static Badge>> {
    let stats = ledger::load_stats(conn, user_id)?;
    let unlocked = unlocked_badges(conn, user_id)?;
    let now = Utc::now().timestamp_millis();

    let mut newly = Vec::new();
    for badge in BADGES {
        if unlocked.contains(badge.key) {
            continue;
        }
        if !rule_satisfied(conn, &stats, &badge.rule)? {
            continue;
        }

        let inserted = conn.execute(
            r#"INSERT OR IGNORE INTO user_badges (id, user_id, badge_key, earned_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            rusqlite::params![Uuid::new_v4().to_string(), user_id, badge.key, now],
        )?;
        if inserted == 0 {
            // Lost a race with a concurrent evaluation; that call owns
            // the unlock and its reward.
            continue;
        }

        if badge.xp_reward > 0 {
            ledger::grant_in_tx(
                conn,
                user_id,
                ActionType::BadgeBonus,
                badge.xp_reward,
                &format!("badge unlocked: {}", badge.name),
            )?;
        }

        info!(user_id, badge = badge.key, "badge unlocked");
        newly.push(badge);
    }

    Ok(newly)
}

/// Keys of the badges a user has already earned
pub(crate) fn unlocked_badges(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT badge_key FROM user_badges WHERE user_id = ?1")?;
    let keys = stmt
        .query_map([user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(keys)
}

fn rule_satisfied(conn: &Connection, stats: &UserStats, rule: &BadgeRule) -> Result<bool> {
    match rule {
        BadgeRule::StatThreshold { stat, min } => {
            let value = match stat {
                StatKind::Level => i64::from(stats.current_level),
                StatKind::TotalXp => stats.total_xp,
                StatKind::CurrentStreak => i64::from(stats.current_streak),
                StatKind::LongestStreak => i64::from(stats.longest_streak),
            };
            Ok(value >= *min)
        }
        BadgeRule::ActionCount { action, min } => {
            let count = ledger::action_count(conn, &stats.user_id, *action)?;
            Ok(count >= *min)
        }
        BadgeRule::All(rules) => {
            for sub in *rules {
                if !rule_satisfied(conn, stats, sub)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}
