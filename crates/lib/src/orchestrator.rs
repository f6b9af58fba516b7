//! The context object front ends talk to.
//!
//! Owns the host environment (including the session search path), the
//! state store, the availability cache and the dispatcher. Every operation
//! returns a value; nothing here calls back into presentation code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::batch::{BatchCoordinator, BatchResult, BatchTarget};
use crate::buildlog::{self, ExportError};
use crate::compile::{CompileEnv, CompileOptions, CompileRequest, CompileResult, Dispatcher};
use crate::exec::{SystemRunner, ToolRunner};
use crate::state::profiles::DEFAULT_PROFILE;
use crate::state::{
  BuildProfile, History, HistoryEntry, Profiles, RecentFiles, Settings, StateStore, StoreError, Theme,
};
use crate::toolchain::{
  self, HostEnv, InstallOutcome, Installer, ProbeStatus, Prober, RegistryError, SearchPath, SystemInstaller,
  SystemProber, ToolchainDescriptor, ToolchainId,
};

pub struct Orchestrator {
  host: HostEnv,
  store: StateStore,
  prober: Arc<dyn Prober>,
  installer: Box<dyn Installer>,
  dispatcher: Dispatcher,
  availability: HashMap<ToolchainId, ProbeStatus>,
  batch: BatchCoordinator,
}

impl Orchestrator {
  /// Wire up the real host, store and process runner.
  pub fn new() -> Self {
    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner);
    Self::with_parts(
      HostEnv::detect(),
      StateStore::default_store(),
      runner.clone(),
      Arc::new(SystemProber::new(runner.clone())),
      Box::new(SystemInstaller::new(runner)),
    )
  }

  pub fn with_parts(
    host: HostEnv,
    store: StateStore,
    runner: Arc<dyn ToolRunner>,
    prober: Arc<dyn Prober>,
    installer: Box<dyn Installer>,
  ) -> Self {
    Self {
      dispatcher: Dispatcher::new(runner, prober.clone()),
      host,
      store,
      prober,
      installer,
      availability: HashMap::new(),
      batch: BatchCoordinator::new(),
    }
  }

  pub fn host(&self) -> &HostEnv {
    &self.host
  }

  pub fn search_path(&self) -> &SearchPath {
    &self.host.search_path
  }

  pub fn store(&self) -> &StateStore {
    &self.store
  }

  pub fn resolve_toolchain(&self, ext: &str) -> Result<&'static ToolchainDescriptor, RegistryError> {
    toolchain::resolve(ext)
  }

  /// Probe the toolchain for `ext` and refresh the cache.
  pub fn probe(&mut self, ext: &str) -> Result<ProbeStatus, RegistryError> {
    let descriptor = toolchain::resolve(ext)?;
    Ok(self.probe_descriptor(descriptor))
  }

  /// Probe every registered toolchain.
  pub fn probe_all(&mut self) -> Vec<(&'static ToolchainDescriptor, ProbeStatus)> {
    toolchain::all()
      .iter()
      .map(|descriptor| (descriptor, self.probe_descriptor(descriptor)))
      .collect()
  }

  /// Last probe result for `id`, if any probe has run since the last install.
  pub fn cached_status(&self, id: ToolchainId) -> Option<&ProbeStatus> {
    self.availability.get(&id)
  }

  fn probe_descriptor(&mut self, descriptor: &ToolchainDescriptor) -> ProbeStatus {
    let status = self.prober.probe(descriptor, &self.host);
    self.availability.insert(descriptor.id, status.clone());
    status
  }

  /// Cached positives are trusted; a missing tool is probed again since it
  /// may have been installed outside this session.
  fn is_available(&mut self, descriptor: &ToolchainDescriptor) -> bool {
    match self.availability.get(&descriptor.id) {
      Some(status) if status.installed => true,
      _ => self.probe_descriptor(descriptor).installed,
    }
  }

  /// Install the toolchain for `ext`, extending the session search path.
  pub fn install(&mut self, ext: &str) -> Result<InstallOutcome, RegistryError> {
    let descriptor = toolchain::resolve(ext)?;
    if descriptor.built_in {
      return Ok(InstallOutcome::ok(
        format!("{} is built into Windows", descriptor.display_name),
        None,
      ));
    }

    let outcome = self.installer.install(descriptor, &self.host);
    if outcome.success {
      if let Some(dir) = &outcome.path_addition {
        info!(dir = %dir.display(), "extending search path");
        self.host.search_path.prepend(dir.clone());
      }
      self.availability.remove(&descriptor.id);
    }
    Ok(outcome)
  }

  pub fn compile(&mut self, source: &Path, output: &Path, options: CompileOptions) -> CompileResult {
    if let Err(e) = self.add_recent(source) {
      warn!(error = %e, "could not update recent files");
    }

    let settings = self.settings();
    let env = CompileEnv {
      host: &self.host,
      settings: &settings,
      store: &self.store,
    };
    let request = CompileRequest {
      source: source.to_path_buf(),
      output: output.to_path_buf(),
      options,
    };
    self.dispatcher.compile(&request, &env)
  }

  /// Compile each path next to itself with the default profile.
  pub fn compile_batch(&mut self, paths: &[PathBuf]) -> BatchResult {
    let mut batch = std::mem::take(&mut self.batch);
    for path in paths {
      batch.enqueue(path.clone());
    }
    let result = batch.run_all(self);
    self.batch = batch;
    result
  }

  /// Options for the named profile, or the default profile's.
  pub fn options_for(&self, profile_name: Option<&str>) -> CompileOptions {
    let name = profile_name
      .map(str::to_string)
      .unwrap_or_else(|| self.settings().default_profile);
    match self.load_profile(&name) {
      Some(profile) => CompileOptions {
        profile_name: name,
        profile,
        ..CompileOptions::default()
      },
      None => {
        debug!(profile = %name, "unknown profile, using default");
        CompileOptions {
          profile_name: DEFAULT_PROFILE.to_string(),
          profile: self.load_profile(DEFAULT_PROFILE).unwrap_or_default(),
          ..CompileOptions::default()
        }
      }
    }
  }

  pub fn load_profile(&self, name: &str) -> Option<BuildProfile> {
    self.store.load::<Profiles>().get(name).cloned()
  }

  pub fn save_profile(&self, name: &str, profile: BuildProfile) -> Result<(), StoreError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(StoreError::InvalidProfileName(name.to_string()));
    }
    let mut profiles: Profiles = self.store.load();
    profiles.insert(name, profile);
    self.store.save(&profiles)
  }

  pub fn profile_names(&self) -> Vec<String> {
    self.store.load::<Profiles>().names()
  }

  pub fn add_recent(&self, path: &Path) -> Result<(), StoreError> {
    let cap = self.settings().max_recent_files;
    let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut recent: RecentFiles = self.store.load();
    recent.add(path, cap);
    self.store.save(&recent)
  }

  pub fn get_recent(&self) -> Vec<PathBuf> {
    let cap = self.settings().max_recent_files;
    self.store.load::<RecentFiles>().existing(cap)
  }

  /// Newest history entries, never more than `max_history_items` and at
  /// most `limit` when given.
  pub fn get_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
    let cap = self.settings().max_history_items;
    let history: History = self.store.load();
    history.latest(limit.map_or(cap, |limit| limit.min(cap))).to_vec()
  }

  pub fn settings(&self) -> Settings {
    self.store.load()
  }

  pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
    self.store.save(settings)
  }

  pub fn theme(&self) -> Theme {
    self.settings().theme
  }

  pub fn export_log(&self, text: &str, source: &Path) -> Result<PathBuf, ExportError> {
    buildlog::export_log(text, source)
  }

  pub fn estimate_output_size(&self, path: &Path) -> Option<u64> {
    toolchain::estimate_output_size(path)
  }
}

impl Default for Orchestrator {
  fn default() -> Self {
    Self::new()
  }
}

impl BatchTarget for Orchestrator {
  fn available(&mut self, source: &Path) -> bool {
    match toolchain::resolve_path(source) {
      Ok(descriptor) => self.is_available(descriptor),
      Err(_) => false,
    }
  }

  fn compile_one(&mut self, source: &Path, output: &Path) -> CompileResult {
    let options = self.options_for(None);
    self.compile(source, output, options)
  }

  fn notifications_enabled(&self) -> bool {
    self.settings().show_notifications
  }
}
