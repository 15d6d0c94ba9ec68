use crate::driver::DriverDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One `client` or `service` block of the config document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Explicit driver name; inferred from `url` when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    #[serde(default)]
    pub url: String,

    /// Skip certificate verification on outbound TLS.
    #[serde(default)]
    pub insecure: bool,

    /// Per-exchange timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certfile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyfile: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver: None,
            url: String::new(),
            insecure: false,
            timeout: default_timeout(),
            certfile: None,
            keyfile: None,
        }
    }
}

impl DriverConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn descriptor(&self) -> DriverDescriptor {
        DriverDescriptor::new(self.driver.clone(), self.url.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

fn default_timeout() -> u64 {
    5
}
