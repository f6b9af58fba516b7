//! Crate-wide constants.

pub const APP_NAME: &str = "exeforge";

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the per-user root holding `config/` and `data/`.
pub const HOME_ENV: &str = "EXEFORGE_HOME";

pub const TOOLCHAINS_DIR: &str = "toolchains";

pub const INSTALL_LOG_FILENAME: &str = "install.log";

/// RFC 3161 timestamp authority used when signing artifacts.
pub const TIMESTAMP_URL: &str = "http://timestamp.digicert.com";

/// Shown in place of passwords in logs and printed settings.
pub const SECRET_MASK: &str = "***";

/// Prefix for randomized temp directories (downloads, staging).
pub const TEMP_PREFIX: &str = "exeforge-";

pub const GO_VERSION: &str = "1.22.5";

pub const AUTOHOTKEY_VERSION: &str = "1.1.37.02";
