use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::aliases::AliasTable;
use super::driver::DriverConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;

/// Files read in order when no explicit path list is given. Later files win.
pub const DEFAULT_SEARCH_PATH: &str = "dohgate.json;~/.dohgate.json;/etc/dohgate.json";

/// Main configuration document
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub logging: LoggingConfig,

    /// Upstream used by one-shot queries and by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<DriverConfig>,

    /// Listener started when no query is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<DriverConfig>,

    pub aliases: AliasTable,
}

impl Config {
    /// Load and merge configuration
    ///
    /// Every existing file of `search_path` (`;`-separated) is read in order,
    /// then every file of `explicit`. Objects merge key by key, scalars are
    /// replaced. Missing files are skipped; malformed ones are an error.
    pub fn load(
        search_path: &str,
        explicit: Option<&str>,
        cli_overrides: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut merged = Value::Object(Default::default());

        let paths = split_paths(search_path).chain(explicit.into_iter().flat_map(split_paths));
        for path in paths {
            if let Some(doc) = Self::read_document(&path)? {
                merge_values(&mut merged, doc);
            }
        }

        let mut config: Config = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Parse("merged document".to_string(), e.to_string()))?;

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a single JSON document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse("<inline>".to_string(), e.to_string()))
    }

    fn read_document(path: &Path) -> Result<Option<Value>, ConfigError> {
        let display = path.display().to_string();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::FileRead(display, e.to_string())),
        };

        let value: Value =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(display.clone(), e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::Parse(display, "top level must be an object".to_string()));
        }
        Ok(Some(value))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(url) = overrides.url {
            self.client.get_or_insert_with(DriverConfig::default).url = url;
        }
        if let Some(driver) = overrides.driver {
            self.client.get_or_insert_with(DriverConfig::default).driver = Some(driver);
        }
        if overrides.insecure {
            if let Some(client) = self.client.as_mut() {
                client.insecure = true;
            }
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, block) in [("client", &self.client), ("service", &self.service)] {
            if let Some(block) = block {
                if block.url.trim().is_empty() {
                    return Err(ConfigError::Validation(format!("{} has no url", section)));
                }
            }
        }

        if let Some(service) = &self.service {
            if service.certfile.is_some() != service.keyfile.is_some() {
                return Err(ConfigError::Validation(
                    "service certfile and keyfile must be set together".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub driver: Option<String>,
    pub insecure: bool,
    pub log_level: Option<String>,
}

fn split_paths(list: &str) -> impl Iterator<Item = PathBuf> + '_ {
    list.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(expand_home)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_replaces_scalars_and_merges_objects() {
        let mut base = json!({"loglevel": "warn", "client": {"url": "udp://1.1.1.1", "timeout": 3}});
        merge_values(&mut base, json!({"loglevel": "debug", "client": {"timeout": 9}}));

        assert_eq!(
            base,
            json!({"loglevel": "debug", "client": {"url": "udp://1.1.1.1", "timeout": 9}})
        );
    }

    #[test]
    fn test_split_paths_skips_empty_entries() {
        let paths: Vec<_> = split_paths("a.json;; b.json ;").collect();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }
}
