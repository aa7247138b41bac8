use std::path::Path;

use anyhow::Result;
use log::info;

use crate::app::App;
use crate::config::Config;

pub(crate) async fn handle(config_path: Option<&Path>) -> Result<()> {
    let location = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    let config = Config::load(config_path)?;
    let app = App::bootstrap(&config).await?;

    info!("✓ Configuration OK: {}", location.display());
    info!("");
    info!("Backends:");
    for name in app.backend_names() {
        info!("  {name}");
    }
    info!("HTTP timeout: {}s", config.http.timeout_secs);
    info!(
        "Script workers: {} ({}s limit)",
        config.scripts.workers, config.scripts.timeout_secs
    );
    info!("Script processes: {}", config.processes.len());
    info!("Processes registered: {}", app.process_names().len());
    Ok(())
}
