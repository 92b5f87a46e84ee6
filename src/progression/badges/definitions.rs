//! Badge definitions and metadata
//!
//! The catalog is read-mostly data: every unlock condition is a
//! `BadgeRule` value interpreted by the evaluator, not executable logic,
//! so rules stay testable and extensible.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::progression::models::ActionType;

/// Audience a badge is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Universal,
    Agent,
    Homeowner,
    Searcher,
}

impl BadgeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Universal => "Universal",
            Self::Agent => "Agents",
            Self::Homeowner => "Homeowners",
            Self::Searcher => "Searchers",
        }
    }
}

/// Accumulated stat a rule can threshold on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Level,
    TotalXp,
    CurrentStreak,
    LongestStreak,
}

/// Unlock condition, evaluated against stats and ledger-derived event
/// counts
#[derive(Debug, Clone, Copy)]
pub enum BadgeRule {
    /// A stat reached a threshold (e.g. level >= 5)
    StatThreshold { stat: StatKind, min: i64 },
    /// The user performed an action at least `min` times
    ActionCount { action: ActionType, min: u32 },
    /// Every sub-rule holds
    All(&'static [BadgeRule]),
}

/// Badge definition with all metadata
#[derive(Debug, Clone)]
pub struct Badge {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub xp_reward: i64,
    pub rule: BadgeRule,
}

/// The global badge catalog
pub static BADGES: &[Badge] = &[
    // === UNIVERSAL ===
    Badge {
        key: "welcome_home",
        name: "Welcome Home",
        description: "Sign in for the first time",
        icon: "🏠",
        category: BadgeCategory::Universal,
        xp_reward: 10,
        rule: BadgeRule::ActionCount {
            action: ActionType::Login,
            min: 1,
        },
    },
    Badge {
        key: "curious_buyer",
        name: "Curious Buyer",
        description: "Submit your first inquiry",
        icon: "📨",
        category: BadgeCategory::Universal,
        xp_reward: 15,
        rule: BadgeRule::ActionCount {
            action: ActionType::InquirySubmitted,
            min: 1,
        },
    },
    Badge {
        key: "all_moved_in",
        name: "All Moved In",
        description: "Complete your profile",
        icon: "✅",
        category: BadgeCategory::Universal,
        xp_reward: 20,
        rule: BadgeRule::ActionCount {
            action: ActionType::ProfileCompleted,
            min: 1,
        },
    },
    Badge {
        key: "market_watcher",
        name: "Market Watcher",
        description: "Reach level 5",
        icon: "📊",
        category: BadgeCategory::Universal,
        xp_reward: 50,
        rule: BadgeRule::StatThreshold {
            stat: StatKind::Level,
            min: 5,
        },
    },
    Badge {
        key: "market_legend",
        name: "Market Legend",
        description: "Reach level 10",
        icon: "🏆",
        category: BadgeCategory::Universal,
        xp_reward: 100,
        rule: BadgeRule::StatThreshold {
            stat: StatKind::Level,
            min: 10,
        },
    },
    Badge {
        key: "week_regular",
        name: "Seven-Day Regular",
        description: "Keep a 7-day activity streak",
        icon: "🔥",
        category: BadgeCategory::Universal,
        xp_reward: 25,
        rule: BadgeRule::StatThreshold {
            stat: StatKind::LongestStreak,
            min: 7,
        },
    },
    Badge {
        key: "always_looking",
        name: "Always Looking",
        description: "Keep a 30-day activity streak",
        icon: "👑",
        category: BadgeCategory::Universal,
        xp_reward: 100,
        rule: BadgeRule::StatThreshold {
            stat: StatKind::LongestStreak,
            min: 30,
        },
    },
    Badge {
        key: "dedicated_hunter",
        name: "Dedicated House Hunter",
        description: "Reach level 5 with a 7-day streak",
        icon: "🎯",
        category: BadgeCategory::Universal,
        xp_reward: 75,
        rule: BadgeRule::All(&[
            BadgeRule::StatThreshold {
                stat: StatKind::Level,
                min: 5,
            },
            BadgeRule::StatThreshold {
                stat: StatKind::LongestStreak,
                min: 7,
            },
        ]),
    },
    // === SEARCHER ===
    Badge {
        key: "first_find",
        name: "First Find",
        description: "Save your first property",
        icon: "⭐",
        category: BadgeCategory::Searcher,
        xp_reward: 10,
        rule: BadgeRule::ActionCount {
            action: ActionType::PropertySaved,
            min: 1,
        },
    },
    Badge {
        key: "shortlist_builder",
        name: "Shortlist Builder",
        description: "Save 25 properties",
        icon: "📌",
        category: BadgeCategory::Searcher,
        xp_reward: 50,
        rule: BadgeRule::ActionCount {
            action: ActionType::PropertySaved,
            min: 25,
        },
    },
    Badge {
        key: "side_by_side",
        name: "Side by Side",
        description: "Run 10 property comparisons",
        icon: "⚖️",
        category: BadgeCategory::Searcher,
        xp_reward: 30,
        rule: BadgeRule::ActionCount {
            action: ActionType::PropertyCompared,
            min: 10,
        },
    },
    // === AGENT ===
    Badge {
        key: "open_line",
        name: "Open Line",
        description: "Answer your first inquiry",
        icon: "☎️",
        category: BadgeCategory::Agent,
        xp_reward: 15,
        rule: BadgeRule::ActionCount {
            action: ActionType::InquiryAnswered,
            min: 1,
        },
    },
    Badge {
        key: "ten_answered",
        name: "Ten Answered",
        description: "Answer 10 inquiries",
        icon: "💼",
        category: BadgeCategory::Agent,
        xp_reward: 50,
        rule: BadgeRule::ActionCount {
            action: ActionType::InquiryAnswered,
            min: 10,
        },
    },
    Badge {
        key: "top_responder",
        name: "Top Responder",
        description: "Answer 100 inquiries",
        icon: "🥇",
        category: BadgeCategory::Agent,
        xp_reward: 150,
        rule: BadgeRule::ActionCount {
            action: ActionType::InquiryAnswered,
            min: 100,
        },
    },
    // === HOMEOWNER ===
    Badge {
        key: "on_the_market",
        name: "On the Market",
        description: "Publish your first listing",
        icon: "🪧",
        category: BadgeCategory::Homeowner,
        xp_reward: 20,
        rule: BadgeRule::ActionCount {
            action: ActionType::ListingCreated,
            min: 1,
        },
    },
    Badge {
        key: "portfolio",
        name: "Portfolio",
        description: "Publish 5 listings",
        icon: "🏘️",
        category: BadgeCategory::Homeowner,
        xp_reward: 60,
        rule: BadgeRule::ActionCount {
            action: ActionType::ListingCreated,
            min: 5,
        },
    },
];

static BADGE_INDEX: Lazy<HashMap<&'static str, &'static Badge>> =
    Lazy::new(|| BADGES.iter().map(|b| (b.key, b)).collect());

impl Badge {
    /// Look up a badge by its catalog key
    pub fn get(key: &str) -> Option<&'static Badge> {
        BADGE_INDEX.get(key).copied()
    }

    pub fn total_count() -> usize {
        BADGES.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        assert_eq!(BADGE_INDEX.len(), BADGES.len());
    }

    #[test]
    fn test_lookup_by_key() {
        let badge = Badge::get("first_find").unwrap();
        assert_eq!(badge.name, "First Find");
        assert!(Badge::get("no_such_badge").is_none());
    }

    #[test]
    fn test_rewards_are_non_negative() {
        assert!(BADGES.iter().all(|b| b.xp_reward >= 0));
    }
}
