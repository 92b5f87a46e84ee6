use anyhow::Result;

use propquest::config::Config;
use propquest::progression::ProgressionManager;
use propquest::server;

/// Run the local JSON API server (blocks until the process exits)
pub fn serve_command(config: &Config, engine: ProgressionManager) -> Result<()> {
    let token = Some(config.settings.http.token.clone()).filter(|t| !t.trim().is_empty());
    server::run(engine, config.settings.http.port, token)
}
