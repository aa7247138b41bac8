use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use log::info;

use crate::app::App;
use crate::config::Config;

pub(crate) async fn handle(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let app = App::bootstrap(&config).await?;

    // group by namespace: everything before the last dot
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let names = app.process_names();
    for name in &names {
        let (namespace, process) = name.rsplit_once('.').unwrap_or(("", name.as_str()));
        groups.entry(namespace).or_default().push(process);
    }

    for (namespace, processes) in groups {
        info!("{namespace}");
        for process in processes {
            info!("  {process}");
        }
    }
    Ok(())
}
