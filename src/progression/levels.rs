//! XP thresholds and level titles
//!
//! Thresholds form a strictly increasing cumulative sequence. Level 10 is
//! terminal: "max level reached" is a display state, not an error.

/// Level definition
#[derive(Debug, Clone)]
pub struct Level {
    pub level: u32,
    /// Cumulative XP needed to reach this level
    pub xp_required: i64,
    pub title: &'static str,
}

/// All level definitions (must be sorted by level)
pub static LEVELS: &[Level] = &[
    Level {
        level: 1,
        xp_required: 0,
        title: "Newcomer",
    },
    Level {
        level: 2,
        xp_required: 100,
        title: "Open House Guest",
    },
    Level {
        level: 3,
        xp_required: 250,
        title: "House Hunter",
    },
    Level {
        level: 4,
        xp_required: 500,
        title: "Neighborhood Scout",
    },
    Level {
        level: 5,
        xp_required: 900,
        title: "Market Watcher",
    },
    Level {
        level: 6,
        xp_required: 1400,
        title: "Deal Maker",
    },
    Level {
        level: 7,
        xp_required: 2000,
        title: "Property Pro",
    },
    Level {
        level: 8,
        xp_required: 2750,
        title: "Portfolio Builder",
    },
    Level {
        level: 9,
        xp_required: 3650,
        title: "Estate Expert",
    },
    Level {
        level: 10,
        xp_required: 4700,
        title: "Market Legend",
    },
];

impl Level {
    /// The level a given XP total maps to: the highest level whose
    /// threshold does not exceed the total.
    pub fn for_xp(xp: i64) -> &'static Level {
        LEVELS
            .iter()
            .rev()
            .find(|l| xp >= l.xp_required)
            .unwrap_or(&LEVELS[0])
    }

    /// Cumulative XP needed for the next level (None at max level)
    pub fn xp_for_next(current_level: u32) -> Option<i64> {
        LEVELS
            .iter()
            .find(|l| l.level == current_level + 1)
            .map(|l| l.xp_required)
    }

    /// Display title for a level (clamped into the defined range)
    pub fn title_for(level: u32) -> &'static str {
        LEVELS
            .iter()
            .rev()
            .find(|l| l.level <= level)
            .unwrap_or(&LEVELS[0])
            .title
    }

    pub fn max_level() -> u32 {
        LEVELS.last().map(|l| l.level).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_strictly_increasing() {
        for pair in LEVELS.windows(2) {
            assert!(pair[0].xp_required < pair[1].xp_required);
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(Level::for_xp(0).level, 1);
        assert_eq!(Level::for_xp(99).level, 1);
        assert_eq!(Level::for_xp(100).level, 2);
        assert_eq!(Level::for_xp(249).level, 2);
        assert_eq!(Level::for_xp(900).level, 5);
        assert_eq!(Level::for_xp(4700).level, 10);
        assert_eq!(Level::for_xp(1_000_000).level, 10); // beyond max
    }

    #[test]
    fn test_xp_for_next() {
        assert_eq!(Level::xp_for_next(1), Some(100));
        assert_eq!(Level::xp_for_next(9), Some(4700));
        assert_eq!(Level::xp_for_next(10), None);
    }

    #[test]
    fn test_title_for() {
        assert_eq!(Level::title_for(1), "Newcomer");
        assert_eq!(Level::title_for(10), "Market Legend");
        // Out-of-range levels clamp into the table
        assert_eq!(Level::title_for(0), "Newcomer");
        assert_eq!(Level::title_for(99), "Market Legend");
    }
}
