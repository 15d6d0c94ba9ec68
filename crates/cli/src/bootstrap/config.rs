use anyhow::Context;
use dohgate_domain::{CliOverrides, Config, DEFAULT_SEARCH_PATH};

/// Merges the default search path, then `explicit`, then the CLI flags.
pub fn load_config(explicit: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    load_config_from(DEFAULT_SEARCH_PATH, explicit, overrides)
}

fn load_config_from(
    search_path: &str,
    explicit: Option<&str>,
    overrides: CliOverrides,
) -> anyhow::Result<Config> {
    Config::load(search_path, explicit, overrides).context("Failed to load configuration")
}
