// show_config.rs - `gsb config`: print the effective configuration.

use crate::config::AppConfig;

pub fn execute(config: &AppConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
