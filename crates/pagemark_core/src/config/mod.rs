//! Configuration management for PageMark.
//!
//! This module provides:
//! - TOML-based settings with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Defaults for everything, so a missing file just works
//!
//! # Example
//!
//! ```no_run
//! use pagemark_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/pagemark.toml");
//! config.load_or_create().unwrap();
//! println!("Render DPI: {}", config.settings().render.dpi);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{LoggingSettings, RenderSettings, Settings, WatermarkSettings};
