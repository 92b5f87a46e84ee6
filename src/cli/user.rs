//! Per-user commands: profile, grant, claim, activity, badges,
//! transactions

use anyhow::Result;
use chrono::NaiveDate;

use propquest::progression::badges::Badge;
use propquest::progression::models::ActionType;
use propquest::progression::{day_key, ProgressionManager};

fn resolve_day(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(day_key::today_utc()),
        Some(s) => {
            day_key::parse_day(s).ok_or_else(|| anyhow::anyhow!("invalid date: {s} (want YYYY-MM-DD)"))
        }
    }
}

/// Print a user's display-ready profile
pub fn profile_command(engine: &ProgressionManager, user_id: &str) -> Result<()> {
    let profile = engine.profile(user_id)?;

    println!("{} - Level {} ({})", profile.user_id, profile.level, profile.title);
    println!(
        "  XP: {} ({:.0}% to next level, {}/{})",
        profile.total_xp, profile.progress.percentage, profile.progress.current, profile.progress.required
    );
    println!(
        "  Streak: {} days (longest {})",
        profile.current_streak, profile.longest_streak
    );
    println!("  Badges: {}", profile.badge_count);
    println!("  Frame: {:?}", profile.frame);
    Ok(())
}

/// Append an XP grant (or penalty) to the ledger
pub fn grant_command(
    engine: &ProgressionManager,
    user_id: &str,
    action: &str,
    amount: i64,
    description: &str,
) -> Result<()> {
    let action = ActionType::parse(action)?;
    let (transaction, level_up) = engine.grant_xp(user_id, action, amount, description)?;

    println!(
        "Granted {} XP to {} ({})",
        transaction.xp_amount,
        user_id,
        transaction.action_type.as_str()
    );
    if let Some(up) = level_up {
        println!("  Level up! {} -> {} ({})", up.old_level, up.new_level, up.new_title);
    }
    Ok(())
}

/// Claim the daily bonus
pub fn claim_command(engine: &ProgressionManager, user_id: &str, date: Option<&str>) -> Result<()> {
    let today = resolve_day(date)?;
    engine.ensure_user(user_id)?;
    let outcome = engine.claim_daily(user_id, today)?;

    if outcome.already_claimed {
        println!("{} already claimed the bonus for {}", user_id, day_key::format_day(today));
    } else {
        println!(
            "{} claimed {} XP ({} base + {} streak bonus), streak is {} days",
            user_id,
            outcome.xp_earned,
            outcome.xp_earned - outcome.streak_bonus,
            outcome.streak_bonus,
            outcome.current_streak
        );
    }
    Ok(())
}

/// Record a day of qualifying activity
pub fn activity_command(
    engine: &ProgressionManager,
    user_id: &str,
    date: Option<&str>,
) -> Result<()> {
    let day = resolve_day(date)?;
    engine.ensure_user(user_id)?;
    let update = engine.record_activity(user_id, day)?;

    println!(
        "{}: streak {} days (longest {})",
        user_id, update.current_streak, update.longest_streak
    );
    if update.milestone_xp > 0 {
        println!("  Milestone bonus: +{} XP", update.milestone_xp);
    }
    Ok(())
}

/// Show earned badges; with `evaluate`, run the unlock rules first
pub fn badges_command(engine: &ProgressionManager, user_id: &str, evaluate: bool) -> Result<()> {
    if evaluate {
        let newly = engine.evaluate_badges(user_id)?;
        for badge in &newly {
            println!("Unlocked: {} {} (+{} XP)", badge.icon, badge.name, badge.xp_reward);
        }
        if newly.is_empty() {
            println!("No new badges");
        }
    }

    let earned = engine.earned_badges(user_id)?;
    println!("{} has {}/{} badges:", user_id, earned.len(), Badge::total_count());
    for row in &earned {
        match Badge::get(&row.badge_key) {
            Some(badge) => println!("  {} {} - {}", badge.icon, badge.name, badge.description),
            None => println!("  {} (retired)", row.badge_key),
        }
    }
    Ok(())
}

/// Show a user's recent ledger entries
pub fn transactions_command(
    engine: &ProgressionManager,
    user_id: &str,
    limit: usize,
) -> Result<()> {
    let transactions = engine.transactions(user_id, limit)?;
    if transactions.is_empty() {
        println!("No transactions for {}", user_id);
        return Ok(());
    }

    for tx in &transactions {
        println!(
            "{:>6} XP  {:<18} {}",
            tx.xp_amount,
            tx.action_type.as_str(),
            tx.description
        );
    }

    if !engine.reconcile(user_id)? {
        println!("warning: ledger sum does not match the stored total");
    }
    Ok(())
}
