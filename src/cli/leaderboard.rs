//! Leaderboard command

use anyhow::Result;

use propquest::progression::{LeaderboardCategory, ProgressionManager};

/// Print the top entries for a category, optionally with a viewer's rank
pub fn leaderboard_command(
    engine: &ProgressionManager,
    category: &str,
    limit: usize,
    viewer: Option<&str>,
) -> Result<()> {
    let category = LeaderboardCategory::parse(category)?;
    let entries = engine.leaderboard(category, limit)?;

    println!("Leaderboard: {}", category.as_str());
    if entries.is_empty() {
        println!("  (no entries yet)");
    }
    for entry in &entries {
        println!(
            "  #{:<3} {:<20} score {:<8} level {:<3} badges {}",
            entry.rank, entry.user_id, entry.score, entry.level, entry.badge_count
        );
    }

    if let Some(user_id) = viewer {
        match engine.rank_for(category, user_id)? {
            Some(rank) => println!("  {} is ranked #{}", user_id, rank),
            None => println!("  {} is not on this board", user_id),
        }
    }
    Ok(())
}
