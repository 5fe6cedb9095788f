//! Configuration management.
//!
//! TOML-backed settings with per-field defaults and a manager handling
//! load / load-or-create / atomic save.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{OutputSettings, Settings, ToolSettings, TranslateSettings};
