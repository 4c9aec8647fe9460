//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a default so partially written files still load.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Page rasterization settings.
    #[serde(default)]
    pub render: RenderSettings,

    /// Watermark rendering settings.
    #[serde(default)]
    pub watermark: WatermarkSettings,

    /// Run logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Rasterization resolution and the reference page canvas.
///
/// The reference canvas is the baseline page size the watermark scale
/// factor is computed against. The default is an A4 page at 300 DPI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Resolution applied uniformly to every page.
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Reference canvas width in pixels.
    #[serde(default = "default_reference_width")]
    pub reference_width: u32,

    /// Reference canvas height in pixels.
    #[serde(default = "default_reference_height")]
    pub reference_height: u32,
}

fn default_dpi() -> u32 {
    300
}

fn default_reference_width() -> u32 {
    2481
}

fn default_reference_height() -> u32 {
    3508
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            reference_width: default_reference_width(),
            reference_height: default_reference_height(),
        }
    }
}

/// Watermark backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Path to a TTF/OTF font file. When unset, common system bold fonts
    /// are probed at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<String>,
}

/// Configuration for the per-run logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Prefix log lines with a local timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Name of the log file written into the output directory.
    #[serde(default = "default_log_file")]
    pub run_log_file: String,
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> String {
    "conversion.log".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            show_timestamps: default_true(),
            run_log_file: default_log_file(),
        }
    }
}
