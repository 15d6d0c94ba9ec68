pub mod aliases;
pub mod driver;
pub mod errors;
pub mod logging;
pub mod root;

pub use aliases::AliasTable;
pub use driver::DriverConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config, DEFAULT_SEARCH_PATH};
