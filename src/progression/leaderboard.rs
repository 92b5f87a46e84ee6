//! Leaderboard queries - ranked views recomputed on read
//!
//! Each category is an independent scoring function over the same
//! underlying stats. Ordering is descending by score with ties broken by
//! earliest account creation, so ranks are stable and deterministic.
//! Nothing here mutates state, and an empty board is a valid result.

use rusqlite::Connection;

use super::error::{ProgressionError, Result};
use super::models::LeaderboardEntry;

/// Named scoring function for a leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardCategory {
    /// Total accumulated XP
    TopXp,
    /// Inquiries answered (agent activity, counted from the ledger)
    TopAgents,
    /// Longest activity streak
    TopStreaks,
    /// Badges earned
    TopBadges,
}

impl LeaderboardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopXp => "top_xp",
            Self::TopAgents => "top_agents",
            Self::TopStreaks => "top_streaks",
            Self::TopBadges => "top_badges",
        }
    }

    /// Parse an API/CLI category name. Unknown names are a validation
    /// error, not an empty board.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "top_xp" => Ok(Self::TopXp),
            "top_agents" => Ok(Self::TopAgents),
            "top_streaks" => Ok(Self::TopStreaks),
            "top_badges" => Ok(Self::TopBadges),
            other => Err(ProgressionError::validation(format!(
                "unknown leaderboard category: {other}"
            ))),
        }
    }

    pub fn all() -> &'static [LeaderboardCategory] {
        &[Self::TopXp, Self::TopAgents, Self::TopStreaks, Self::TopBadges]
    }

    /// SQL expression computing this category's score for the
    /// `user_stats` row aliased `s`
    fn score_expr(&self) -> &'static str {
        match self {
            Self::TopXp => "s.total_xp",
            Self::TopAgents => {
                "(SELECT COUNT(*) FROM xp_transactions t \
                  WHERE t.user_id = s.user_id AND t.action_type = 'inquiry_answered')"
            }
            Self::TopStreaks => "s.longest_streak",
            Self::TopBadges => "(SELECT COUNT(*) FROM user_badges b WHERE b.user_id = s.user_id)",
        }
    }

    /// TopXp boards list everyone; activity-derived boards only list
    /// users who scored.
    fn includes_zero(&self) -> bool {
        matches!(self, Self::TopXp)
    }
}

/// Top `limit` entries for a category.
pub(crate) fn leaderboard(
    conn: &Connection,
    category: LeaderboardCategory,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>> {
    let zero_filter = if category.includes_zero() {
        ""
    } else {
        "WHERE score > 0"
    };
    let sql = format!(
        r#"SELECT s.user_id, {score} AS score, s.current_level,
                  (SELECT COUNT(*) FROM user_badges b WHERE b.user_id = s.user_id) AS badge_count
           FROM user_stats s
           {zero_filter}
           ORDER BY score DESC, s.created_at ASC, s.user_id ASC
           LIMIT ?1"#,
        score = category.score_expr(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, u32>(3)?,
        ))
    })?;

    let mut entries = Vec::new();
    for (i, row) in rows.enumerate() {
        let (user_id, score, level, badge_count) = row?;
        entries.push(LeaderboardEntry {
            user_id,
            rank: (i + 1) as u32,
            score,
            level,
            badge_count,
        });
    }
    Ok(entries)
}

/// The rank a user currently holds in a category, or None when they do
/// not appear on that board.
pub(crate) fn rank_for(
    conn: &Connection,
    category: LeaderboardCategory,
    user_id: &str,
) -> Result<Option<u32>> {
    let score_expr = category.score_expr();

    let mine: Option<(i64, i64)> = {
        let sql = format!(
            "SELECT {score_expr} AS score, s.created_at FROM user_stats s WHERE s.user_id = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([user_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        match rows.next() {
            Some(row) => Some(row?),
            None => None,
        }
    };

    let Some((my_score, my_created)) = mine else {
        return Err(ProgressionError::not_found(format!("user {user_id}")));
    };
    if my_score == 0 && !category.includes_zero() {
        return Ok(None);
    }

    // Everyone strictly ahead under the (score DESC, created_at ASC)
    // ordering
    let sql = format!(
        r#"SELECT COUNT(*) FROM user_stats s
           WHERE {score_expr} > ?1
              OR ({score_expr} = ?1 AND s.created_at < ?2)"#
    );
    let ahead: u32 = conn.query_row(&sql, rusqlite::params![my_score, my_created], |r| r.get(0))?;
    Ok(Some(ahead + 1))
}
