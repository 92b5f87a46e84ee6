use anyhow::Result;

use propquest::config::Config;

/// Write the default config template to ~/.propquest/config.toml
pub fn init_command(force: bool) -> Result<()> {
    let path = Config::init_global(force)?;
    println!("Wrote config to {}", path.display());
    Ok(())
}
