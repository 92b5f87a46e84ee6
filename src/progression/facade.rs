//! Display-ready derivations over user stats
//!
//! Pure functions of `total_xp` / level / streak - no side effects, safe
//! to recompute on every render.

use serde::Serialize;

use super::levels::Level;
use super::models::LevelProgress;

/// Cosmetic profile frame tier, derived from level and streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFrame {
    Standard,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Progress toward the next level threshold, clamped to 100% at max level.
pub fn progress_to_next_level(total_xp: i64) -> LevelProgress {
    let level = Level::for_xp(total_xp);
    match Level::xp_for_next(level.level) {
        Some(next) => {
            let current = total_xp - level.xp_required;
            let required = next - level.xp_required;
            let percentage = if required > 0 {
                ((current as f32 / required as f32) * 100.0).clamp(0.0, 100.0)
            } else {
                100.0
            };
            LevelProgress {
                current,
                required,
                percentage,
            }
        }
        None => LevelProgress {
            current: 0,
            required: 0,
            percentage: 100.0,
        },
    }
}

/// Display rank name for a level
pub fn user_title(level: u32) -> &'static str {
    Level::title_for(level)
}

/// Cosmetic frame tier. A 30-day streak earns Platinum regardless of
/// level; otherwise the tier follows the level bands.
pub fn profile_frame(level: u32, longest_streak: u32) -> ProfileFrame {
    if longest_streak >= 30 || level >= 9 {
        ProfileFrame::Platinum
    } else if level >= 7 {
        ProfileFrame::Gold
    } else if level >= 5 {
        ProfileFrame::Silver
    } else if level >= 3 {
        ProfileFrame::Bronze
    } else {
        ProfileFrame::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_mid_level() {
        // 150 XP: level 2 (100) -> level 3 (250), a third of the way
        let p = progress_to_next_level(150);
        assert_eq!(p.current, 50);
        assert_eq!(p.required, 150);
        assert!((p.percentage - 33.33).abs() < 0.1);
    }

    #[test]
    fn test_progress_at_threshold() {
        let p = progress_to_next_level(100);
        assert_eq!(p.current, 0);
        assert_eq!(p.percentage, 0.0);
    }

    #[test]
    fn test_progress_clamps_at_max_level() {
        let p = progress_to_next_level(4700);
        assert_eq!(p.percentage, 100.0);
        let p = progress_to_next_level(999_999);
        assert_eq!(p.percentage, 100.0);
    }

    #[test]
    fn test_profile_frame_tiers() {
        assert_eq!(profile_frame(1, 0), ProfileFrame::Standard);
        assert_eq!(profile_frame(3, 0), ProfileFrame::Bronze);
        assert_eq!(profile_frame(5, 6), ProfileFrame::Silver);
        assert_eq!(profile_frame(7, 0), ProfileFrame::Gold);
        assert_eq!(profile_frame(9, 0), ProfileFrame::Platinum);
        // A long streak outranks level
        assert_eq!(profile_frame(2, 30), ProfileFrame::Platinum);
    }
}
