use serde::{Deserialize, Serialize};

/// Log sink settings. Keys sit at the top level of the config document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Appended to when set; stderr otherwise.
    #[serde(rename = "logfile", default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(rename = "loglevel", default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
