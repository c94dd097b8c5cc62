//! Viewer Configuration
//!
//! Paging and scheduling knobs, persisted as `viewer.toml` in the platform
//! config directory. Missing keys fall back to the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol::fs;
use tracing::info;

use crate::components::data_table::ViewportGeometry;
use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_MAX_IN_FLIGHT, DEFAULT_OVERSCAN_ROWS, DEFAULT_PAGE_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_ROW_HEIGHT,
};
use crate::error::{Error, Result};
use crate::helpers::get_or_create_config_dir;

/// Viewer configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Rows per page
    pub page_size: usize,
    /// Fixed row height in pixels
    pub row_height: f32,
    /// Extra rows past the viewport bottom used to pick the target page
    pub overscan_rows: usize,
    /// Maximum outstanding page requests
    pub max_in_flight: usize,
    /// Seconds before an unanswered request is failed
    pub request_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            row_height: DEFAULT_ROW_HEIGHT,
            overscan_rows: DEFAULT_OVERSCAN_ROWS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ViewerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject values the cache cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Invalid {
                message: "page_size must be at least 1".to_string(),
            });
        }
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            return Err(Error::Invalid {
                message: format!("row_height must be positive, got {}", self.row_height),
            });
        }
        if self.max_in_flight == 0 {
            return Err(Error::Invalid {
                message: "max_in_flight must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Invalid {
                message: "request_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate; an empty document yields the defaults
    pub fn from_toml_str(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Viewport geometry at a scroll position using the configured row metrics
    pub fn geometry(&self, scroll_top: f32, viewport_height: f32) -> ViewportGeometry {
        ViewportGeometry::new(scroll_top, viewport_height, self.row_height, self.overscan_rows)
    }

    /// Load from the config file, writing the defaults on first run
    pub async fn load_or_init() -> Result<Self> {
        let path = config_path()?;
        let value = fs::read_to_string(&path).await?;
        if !value.trim().is_empty() {
            return Self::from_toml_str(&value);
        }
        let config = Self::default();
        config.save().await?;
        info!("Wrote default viewer config to {}", path.display());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let value = std::fs::read_to_string(path)?;
        Self::from_toml_str(&value)
    }

    /// Save to the config file
    pub async fn save(&self) -> Result<()> {
        self.save_to(&config_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = self.to_toml_string()?;
        fs::write(path, content).await?;
        Ok(())
    }
}

/// Get or create the viewer configuration file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = get_or_create_config_dir()?;
    let path = config_dir.join(CONFIG_FILE_NAME);

    #[cfg(debug_assertions)]
    info!("Viewer config file: {}", path.display());

    if !path.exists() {
        std::fs::write(&path, "")?;
    }

    Ok(path)
}
