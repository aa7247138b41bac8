use std::path::Path;

use anyhow::Result;
use gantry_value::Value;

use crate::app::App;
use crate::config::Config;

/// Positional arguments are JSON; anything that does not parse is a string
pub(crate) fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|arg| {
            serde_json::from_str::<serde_json::Value>(arg)
                .map_or_else(|_| Value::from(arg.as_str()), Value::from)
        })
        .collect()
}

pub(crate) async fn handle(config_path: Option<&Path>, process: &str, args: &[String]) -> Result<()> {
    let config = Config::load(config_path)?;
    let app = App::bootstrap(&config).await?;

    let args = parse_args(args);
    log::debug!("Running {process} with {args:?}");
    let result = app
        .run(process, args)
        .await
        .map_err(|e| anyhow::anyhow!("{process} failed ({:?}): {e}", e.kind()))?;

    println!("{}", serde_json::to_string_pretty(&result.into_json())?);
    Ok(())
}
