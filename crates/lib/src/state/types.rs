use std::io;

use thiserror::Error;

/// Errors raised when writing documents. Reads never fail; see
/// [`super::StateStore::load`].
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to serialize document: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write document: {0}")]
  Write(#[source] io::Error),

  #[error("invalid profile name: {0:?}")]
  InvalidProfileName(String),
}

/// Errors from editing a single setting by key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingError {
  #[error("unknown setting: {0}")]
  UnknownKey(String),

  #[error("invalid value for {key}: {message}")]
  InvalidValue { key: String, message: String },
}
