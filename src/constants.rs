//! Cache Constants
//!
//! Defaults shared by the configuration layer and the prefetch policy.

/// Rows per page requested from the remote source
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Fixed row height in pixels
pub const DEFAULT_ROW_HEIGHT: f32 = 24.0;

/// Extra rows below the viewport considered when choosing the target page
pub const DEFAULT_OVERSCAN_ROWS: usize = 10;

/// Maximum pages in flight at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Pending request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "viewer.toml";

/// Prefix of the rolling log file written by the binary
pub const LOG_FILE_PREFIX: &str = "dataview.log";

/// Directory triple for `directories::ProjectDirs`
pub const QUALIFIER: &str = "com";
pub const ORGANIZATION: &str = "cyenx";
pub const APPLICATION: &str = "dataview";
