//! Reset command - wipes progression data

use anyhow::Result;

use propquest::progression::ProgressionManager;

pub fn reset_command(engine: &ProgressionManager, user: Option<&str>, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("refusing to delete data without --yes");
    }

    match user {
        Some(user_id) => {
            engine.reset_user(user_id)?;
            println!("Deleted progression data for {}", user_id);
        }
        None => {
            engine.reset_all()?;
            println!("Deleted all progression data");
        }
    }
    Ok(())
}
