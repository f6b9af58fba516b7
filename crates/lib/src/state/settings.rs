//! Application settings document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::Document;
use super::types::SettingError;
use crate::consts::SECRET_MASK;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
  #[default]
  Dark,
  Light,
}

/// What to do with a freshly built executable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostBuildAction {
  #[default]
  None,
  OpenFolder,
  RunExecutable,
  CopyToFolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
  pub theme: Theme,
  pub default_profile: String,
  pub show_notifications: bool,
  pub auto_check_updates: bool,
  pub max_recent_files: usize,
  pub max_history_items: usize,
  pub signing_cert_path: String,
  pub signing_cert_password: String,
  pub post_build_action: PostBuildAction,
  pub post_build_copy_path: String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      theme: Theme::Dark,
      default_profile: "Default".to_string(),
      show_notifications: true,
      auto_check_updates: true,
      max_recent_files: 10,
      max_history_items: 50,
      signing_cert_path: String::new(),
      signing_cert_password: String::new(),
      post_build_action: PostBuildAction::None,
      post_build_copy_path: String::new(),
    }
  }
}

impl Settings {
  /// Names of all settings keys.
  pub fn keys() -> Vec<String> {
    match serde_json::to_value(Settings::default()) {
      Ok(Value::Object(map)) => map.keys().cloned().collect(),
      _ => Vec::new(),
    }
  }

  /// Set one field from its textual form. Values are read as JSON first
  /// (`true`, `25`, `"Light"`), then as a bare string.
  pub fn set(&mut self, key: &str, raw: &str) -> Result<(), SettingError> {
    let Ok(Value::Object(mut map)) = serde_json::to_value(&*self) else {
      return Err(SettingError::UnknownKey(key.to_string()));
    };
    if !map.contains_key(key) {
      return Err(SettingError::UnknownKey(key.to_string()));
    }

    let mut candidates = Vec::with_capacity(2);
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
      candidates.push(parsed);
    }
    candidates.push(Value::String(raw.to_string()));

    let mut last_error = String::new();
    for value in candidates {
      map.insert(key.to_string(), value);
      match serde_json::from_value(Value::Object(map.clone())) {
        Ok(updated) => {
          *self = updated;
          return Ok(());
        }
        Err(e) => last_error = e.to_string(),
      }
    }
    Err(SettingError::InvalidValue {
      key: key.to_string(),
      message: last_error,
    })
  }

  /// Copy safe to print: a non-empty certificate password is masked.
  pub fn redacted(&self) -> Self {
    let mut shown = self.clone();
    if !shown.signing_cert_password.is_empty() {
      shown.signing_cert_password = SECRET_MASK.to_string();
    }
    shown
  }

  /// Value of one field as JSON.
  pub fn get(&self, key: &str) -> Option<Value> {
    match serde_json::to_value(self) {
      Ok(Value::Object(mut map)) => map.remove(key),
      _ => None,
    }
  }
}

impl Document for Settings {
  const FILE_NAME: &'static str = "settings.json";

  /// Overlay each known field onto the defaults individually, so one bad
  /// value does not discard the rest. Unknown fields are dropped.
  fn from_value(value: Value) -> Option<Self> {
    let Value::Object(persisted) = value else {
      return None;
    };
    let Ok(Value::Object(defaults)) = serde_json::to_value(Settings::default()) else {
      return None;
    };

    let mut merged: Map<String, Value> = defaults.clone();
    for (key, candidate) in persisted {
      if !defaults.contains_key(&key) {
        continue;
      }
      let mut trial = defaults.clone();
      trial.insert(key.clone(), candidate.clone());
      if serde_json::from_value::<Settings>(Value::Object(trial)).is_ok() {
        merged.insert(key, candidate);
      } else {
        warn!(field = %key, "invalid setting value, using default");
      }
    }

    serde_json::from_value(Value::Object(merged)).ok()
  }

  fn normalize(&mut self) {
    if self.default_profile.trim().is_empty() {
      self.default_profile = Settings::default().default_profile;
    }
  }
}
