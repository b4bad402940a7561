use std::path::Path;

use pipegate_core::config::GateConfig;

pub async fn run(config_path: &Path, port: u16) -> anyhow::Result<()> {
    let config = GateConfig::load(config_path)?;
    pipegate_server::serve(config, port).await
}
