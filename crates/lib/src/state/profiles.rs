//! Named build profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::Document;

/// Reusable bundle of build options and version metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildProfile {
  /// Show a console window when the executable runs.
  pub console: bool,
  /// Request elevation at launch.
  pub admin: bool,
  /// Bundle into a single file where the toolchain supports it.
  pub single_file: bool,
  pub version: String,
  pub company: String,
  pub copyright: String,
  pub description: String,
  pub product: String,
}

impl Default for BuildProfile {
  fn default() -> Self {
    Self {
      console: false,
      admin: false,
      single_file: true,
      version: "1.0.0.0".to_string(),
      company: String::new(),
      copyright: String::new(),
      description: String::new(),
      product: String::new(),
    }
  }
}

pub const DEFAULT_PROFILE: &str = "Default";

/// The profiles that always exist.
pub fn builtin_profiles() -> [(&'static str, BuildProfile); 4] {
  [
    (DEFAULT_PROFILE, BuildProfile::default()),
    (
      "Console App",
      BuildProfile {
        console: true,
        ..BuildProfile::default()
      },
    ),
    (
      "Admin Tool",
      BuildProfile {
        console: true,
        admin: true,
        ..BuildProfile::default()
      },
    ),
    ("GUI Application", BuildProfile::default()),
  ]
}

/// Profiles keyed by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profiles(BTreeMap<String, BuildProfile>);

impl Default for Profiles {
  fn default() -> Self {
    let mut profiles = Self(BTreeMap::new());
    profiles.normalize();
    profiles
  }
}

impl Profiles {
  pub fn get(&self, name: &str) -> Option<&BuildProfile> {
    self.0.get(name)
  }

  /// Insert or replace a profile.
  pub fn insert(&mut self, name: impl Into<String>, profile: BuildProfile) {
    self.0.insert(name.into(), profile);
  }

  pub fn names(&self) -> Vec<String> {
    self.0.keys().cloned().collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &BuildProfile)> {
    self.0.iter()
  }
}

impl Document for Profiles {
  const FILE_NAME: &'static str = "profiles.json";

  /// Keep every entry that parses; drop the others.
  fn from_value(value: Value) -> Option<Self> {
    let Value::Object(entries) = value else {
      return None;
    };
    let mut profiles = BTreeMap::new();
    for (name, raw) in entries {
      match serde_json::from_value::<BuildProfile>(raw) {
        Ok(profile) => {
          profiles.insert(name, profile);
        }
        Err(e) => warn!(profile = %name, error = %e, "dropping unreadable profile"),
      }
    }
    Some(Self(profiles))
  }

  fn normalize(&mut self) {
    for (name, profile) in builtin_profiles() {
      self.0.entry(name.to_string()).or_insert(profile);
    }
  }
}
