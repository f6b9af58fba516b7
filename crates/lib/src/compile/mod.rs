//! Compilation dispatcher.
//!
//! Drives one compile through `Preparing → Invoking → PostProcessing` and
//! ends in `Completed` or `Failed`. Every failure is captured in the
//! returned [`CompileResult`]; nothing propagates to the caller.

pub mod postbuild;
pub mod strategy;
pub mod types;

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::exec::ToolRunner;
use crate::sign::SigningService;
use crate::state::{History, HistoryEntry, Settings, StateStore};
use crate::toolchain::{self, HostEnv, Prober};

pub use strategy::{Invocation, InvocationStrategy, StrategyInput};
pub use types::{CompileFailure, CompileOptions, CompileRequest, CompileResult, Notice, Phase};

/// What a compile reads from its surroundings.
pub struct CompileEnv<'a> {
  pub host: &'a HostEnv,
  pub settings: &'a Settings,
  pub store: &'a StateStore,
}

/// Marks the dispatcher busy until dropped.
pub struct PhaseGuard<'a> {
  phase: &'a Cell<Phase>,
}

impl PhaseGuard<'_> {
  fn enter(&self, phase: Phase) {
    debug!(?phase, "compile phase");
    self.phase.set(phase);
  }
}

impl Drop for PhaseGuard<'_> {
  fn drop(&mut self) {
    if self.phase.get().in_flight() {
      self.phase.set(Phase::Failed);
    }
  }
}

pub struct Dispatcher {
  phase: Cell<Phase>,
  runner: Arc<dyn ToolRunner>,
  prober: Arc<dyn Prober>,
  signer: SigningService,
}

impl Dispatcher {
  pub fn new(runner: Arc<dyn ToolRunner>, prober: Arc<dyn Prober>) -> Self {
    Self {
      phase: Cell::new(Phase::Idle),
      signer: SigningService::new(runner.clone()),
      runner,
      prober,
    }
  }

  pub fn with_signer(mut self, signer: SigningService) -> Self {
    self.signer = signer;
    self
  }

  pub fn phase(&self) -> Phase {
    self.phase.get()
  }

  /// Claim the dispatcher for one compile.
  pub fn begin(&self) -> Result<PhaseGuard<'_>, CompileFailure> {
    if self.phase.get().in_flight() {
      return Err(CompileFailure::Busy);
    }
    let guard = PhaseGuard { phase: &self.phase };
    guard.enter(Phase::Preparing);
    Ok(guard)
  }

  pub fn compile(&self, request: &CompileRequest, env: &CompileEnv<'_>) -> CompileResult {
    let mut result = CompileResult::new(request);

    let guard = match self.begin() {
      Ok(guard) => guard,
      Err(failure) => {
        warn!(source = %request.source.display(), "compile rejected while another is running");
        result.log.error(failure.to_string());
        result.phase = Phase::Failed;
        result.failure = Some(failure);
        return result;
      }
    };

    result.log.info(format!("Compiling {}", request.source.display()));

    match self.prepare_and_invoke(request, env, &guard, &mut result) {
      Ok(size) => {
        guard.enter(Phase::PostProcessing);
        result.size = Some(size);
        if request.options.sign {
          self.sign(request, env, &mut result);
        }
        result.phase = Phase::Completed;
      }
      Err(failure) => {
        warn!(source = %request.source.display(), error = %failure, "compile failed");
        result.log.error(failure.to_string());
        result.phase = Phase::Failed;
        result.failure = Some(failure);
      }
    }

    // Refused file types never reach history.
    let refused = matches!(result.failure, Some(CompileFailure::Unsupported(_)));
    if !refused {
      record_history(request, env, &mut result);
    }

    if result.is_success() {
      let size = result.size.unwrap_or_default();
      result.log.success(format!(
        "Built {} ({} bytes)",
        request.output.display(),
        size
      ));
      info!(output = %request.output.display(), size, "compile completed");
      self.post_build(request, env, &mut result);
    }

    if env.settings.show_notifications && !refused {
      result.notice = Some(notice_for(&result));
    }

    guard.enter(result.phase);
    result
  }

  fn prepare_and_invoke(
    &self,
    request: &CompileRequest,
    env: &CompileEnv<'_>,
    guard: &PhaseGuard<'_>,
    result: &mut CompileResult,
  ) -> Result<u64, CompileFailure> {
    let source = &request.source;
    if !source.is_file() {
      result.toolchain = toolchain::resolve_path(source).ok().map(|d| d.id);
      return Err(CompileFailure::SourceMissing(source.clone()));
    }

    let descriptor = toolchain::resolve_path(source)?;
    result.toolchain = Some(descriptor.id);
    result.log.info(format!("Toolchain: {}", descriptor.display_name));

    if let Some(dir) = request.output.parent().filter(|d| !d.as_os_str().is_empty())
      && !dir.is_dir()
    {
      fs::create_dir_all(dir).map_err(|e| CompileFailure::OutputDirectory {
        path: dir.to_path_buf(),
        message: e.to_string(),
      })?;
      result.log.info(format!("Created output directory {}", dir.display()));
    }

    let icon: Option<&Path> = match &request.options.icon {
      Some(icon) if icon.is_file() => Some(icon.as_path()),
      Some(icon) => {
        result.warn(format!("Icon not found, building without it: {}", icon.display()));
        None
      }
      None => None,
    };

    let status = self.prober.probe(descriptor, env.host);
    if !status.installed {
      return Err(CompileFailure::ToolchainMissing {
        toolchain: descriptor.display_name,
        reason: status.reason,
      });
    }

    guard.enter(Phase::Invoking);
    let input = StrategyInput {
      source,
      output: &request.output,
      icon,
      profile: &request.options.profile,
      location: status.location.as_deref(),
      host: env.host,
    };
    let invocation = descriptor.id.strategy().prepare(&input)?;
    info!(toolchain = %descriptor.id, cmd = %invocation.command.display(), "invoking toolchain");

    let output = self
      .runner
      .run(&invocation.command)
      .map_err(|e| CompileFailure::Launch {
        tool: invocation.command.program_name(),
        message: e.to_string(),
      })?;
    drop(invocation);

    if !output.success {
      return Err(CompileFailure::ToolFailed {
        code: output.code,
        output: output.combined(),
      });
    }

    match fs::metadata(&request.output) {
      Ok(meta) if meta.is_file() => Ok(meta.len()),
      _ => Err(CompileFailure::NoArtifact(request.output.clone())),
    }
  }

  fn sign(&self, request: &CompileRequest, env: &CompileEnv<'_>, result: &mut CompileResult) {
    let outcome = self.signer.sign(
      &request.output,
      &env.settings.signing_cert_path,
      &env.settings.signing_cert_password,
      env.host,
    );
    if outcome.success {
      result.log.success(outcome.message.clone());
      if let Ok(meta) = fs::metadata(&request.output) {
        result.size = Some(meta.len());
      }
    } else {
      result.warn(format!("Signing failed: {}", outcome.message));
    }
    result.signing = Some(outcome);
  }

  fn post_build(&self, request: &CompileRequest, env: &CompileEnv<'_>, result: &mut CompileResult) {
    let settings = env.settings;
    match postbuild::run(
      settings.post_build_action,
      &request.output,
      &settings.post_build_copy_path,
      self.runner.as_ref(),
      env.host,
    ) {
      Ok(Some(line)) => result.log.info(line),
      Ok(None) => {}
      Err(e) => result.warn(format!("Post-build action failed: {}", e)),
    }
  }
}

fn record_history(request: &CompileRequest, env: &CompileEnv<'_>, result: &mut CompileResult) {
  let Some(toolchain) = result.toolchain else {
    return;
  };
  let entry = HistoryEntry::new(
    &request.source,
    &request.output,
    toolchain,
    result.is_success(),
    &request.options.profile_name,
    result.size.unwrap_or_default(),
  );
  let mut history: History = env.store.load();
  history.record(entry, env.settings.max_history_items);
  if let Err(e) = env.store.save(&history) {
    result.warn(format!("Could not record history: {}", e));
  }
}

fn notice_for(result: &CompileResult) -> Notice {
  let name = result
    .output
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  match &result.failure {
    None => Notice {
      title: "Build succeeded".to_string(),
      body: format!("{} is ready", name),
      success: true,
    },
    Some(failure) => Notice {
      title: "Build failed".to_string(),
      body: failure.to_string(),
      success: false,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exec::ToolOutput;
  use crate::state::{BuildProfile, PostBuildAction};
  use crate::toolchain::ToolchainId;
  use crate::util::testutil::{FakeProber, FakeRunner};
  use std::path::PathBuf;
  use tempfile::TempDir;

  struct Fixture {
    temp: TempDir,
    host: HostEnv,
    store: StateStore,
    settings: Settings,
  }

  impl Fixture {
    fn new() -> Self {
      let temp = TempDir::new().unwrap();
      Self {
        host: HostEnv::isolated(temp.path()),
        store: StateStore::new(temp.path().join("config")),
        settings: Settings::default(),
        temp,
      }
    }

    fn env(&self) -> CompileEnv<'_> {
      CompileEnv {
        host: &self.host,
        settings: &self.settings,
        store: &self.store,
      }
    }

    fn source(&self, name: &str) -> PathBuf {
      let path = self.temp.path().join("scripts").join(name);
      std::fs::create_dir_all(path.parent().unwrap()).unwrap();
      std::fs::write(&path, "Write-Host hi").unwrap();
      path
    }

    fn history(&self) -> History {
      self.store.load()
    }
  }

  fn request(source: PathBuf, output: PathBuf) -> CompileRequest {
    CompileRequest {
      source,
      output,
      options: CompileOptions::default(),
    }
  }

  /// Runner that produces `artifact` and exits zero.
  fn producing(artifact: &Path) -> Arc<FakeRunner> {
    let artifact = artifact.to_path_buf();
    Arc::new(FakeRunner::new().respond(move |_| {
      std::fs::write(&artifact, "MZ-binary").unwrap();
      Ok(ToolOutput::ok("done"))
    }))
  }

  fn dispatcher(runner: Arc<FakeRunner>, installed: &[ToolchainId]) -> Dispatcher {
    Dispatcher::new(runner, Arc::new(FakeProber::with_installed(installed)))
  }

  #[test]
  fn powershell_script_completes_and_records_history() {
    let f = Fixture::new();
    let source = f.source("script.ps1");
    let out_dir = f.temp.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let output = out_dir.join("script.exe");

    let d = dispatcher(producing(&output), &[ToolchainId::Ps2Exe]);
    let result = d.compile(&request(source.clone(), output.clone()), &f.env());

    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.phase, Phase::Completed);
    assert_eq!(d.phase(), Phase::Completed);
    assert_eq!(result.size, Some(9));
    assert_eq!(result.toolchain, Some(ToolchainId::Ps2Exe));

    let history = f.history();
    let entry = &history.entries()[0];
    assert_eq!(entry.source, source);
    assert!(entry.success);
    assert_eq!(entry.size, 9);
    assert_eq!(entry.profile, "Default");
  }

  #[test]
  fn missing_toolchain_fails_without_invoking() {
    let f = Fixture::new();
    let source = f.source("tool.py");
    let output = f.temp.path().join("fresh/dir/tool.exe");
    let runner = Arc::new(FakeRunner::new());

    let result = dispatcher(runner.clone(), &[]).compile(&request(source, output.clone()), &f.env());

    assert_eq!(result.phase, Phase::Failed);
    assert!(output.parent().unwrap().is_dir(), "output directory is created first");
    match &result.failure {
      Some(CompileFailure::ToolchainMissing { toolchain, .. }) => assert_eq!(*toolchain, "PyInstaller"),
      other => panic!("unexpected failure: {other:?}"),
    }
    assert!(runner.commands().is_empty());
    assert!(!f.history().entries()[0].success);
  }

  #[test]
  fn zero_exit_without_artifact_is_failure() {
    let f = Fixture::new();
    let source = f.source("main.go");
    let output = f.temp.path().join("main.exe");
    let runner = Arc::new(FakeRunner::new());

    let result = dispatcher(runner, &[ToolchainId::GoBuild]).compile(&request(source, output.clone()), &f.env());
    assert!(matches!(result.failure, Some(CompileFailure::NoArtifact(ref p)) if p == &output));
    assert_eq!(f.history().entries()[0].size, 0);
  }

  #[test]
  fn nonzero_exit_captures_tool_output() {
    let f = Fixture::new();
    let source = f.source("app.js");
    let runner = Arc::new(FakeRunner::new().respond(|_| {
      Ok(ToolOutput {
        code: Some(2),
        success: false,
        stdout: "> pkg@5.8.1".into(),
        stderr: "Error! Entry file not found".into(),
      })
    }));

    let result =
      dispatcher(runner, &[ToolchainId::Pkg]).compile(&request(source, f.temp.path().join("app.exe")), &f.env());
    match result.failure {
      Some(CompileFailure::ToolFailed { code, output }) => {
        assert_eq!(code, Some(2));
        assert!(output.contains("Entry file not found"));
      }
      other => panic!("unexpected failure: {other:?}"),
    }
  }

  #[test]
  fn unknown_extension_is_refused_without_history() {
    let f = Fixture::new();
    let source = f.source("notes.txt");
    let runner = Arc::new(FakeRunner::new());

    let result = dispatcher(runner.clone(), &ToolchainId::ALL).compile(&request(source, f.temp.path().join("n.exe")), &f.env());
    assert!(matches!(result.failure, Some(CompileFailure::Unsupported(_))));
    assert!(result.notice.is_none());
    assert!(runner.commands().is_empty());
    assert!(f.history().entries().is_empty());
  }

  #[test]
  fn missing_source_is_recorded() {
    let f = Fixture::new();
    let source = f.temp.path().join("gone.rb");
    let result = dispatcher(Arc::new(FakeRunner::new()), &ToolchainId::ALL)
      .compile(&request(source.clone(), f.temp.path().join("gone.exe")), &f.env());

    assert!(matches!(result.failure, Some(CompileFailure::SourceMissing(_))));
    let history = f.history();
    assert_eq!(history.entries()[0].source, source);
    assert_eq!(history.entries()[0].toolchain, ToolchainId::Ocra);
  }

  #[test]
  fn missing_icon_is_dropped_with_warning() {
    let f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");
    let runner = producing(&output);
    let mut req = request(source, output);
    req.options.icon = Some(f.temp.path().join("missing.ico"));

    let result = dispatcher(runner.clone(), &[ToolchainId::Ps2Exe]).compile(&req, &f.env());
    assert!(result.is_success());
    assert!(result.warnings[0].starts_with("Icon not found"));
    assert!(!runner.commands()[0].args_lossy()[4].contains("-IconFile"));
  }

  #[test]
  fn signing_without_certificate_still_completes() {
    let f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");
    let mut req = request(source, output.clone());
    req.options.sign = true;

    let result = dispatcher(producing(&output), &[ToolchainId::Ps2Exe]).compile(&req, &f.env());
    assert_eq!(result.phase, Phase::Completed);
    assert_eq!(result.signing.as_ref().unwrap().message, "Certificate not found");
    assert!(result.warnings.iter().any(|w| w.contains("Certificate not found")));
    assert!(f.history().entries()[0].success);
  }

  #[test]
  fn second_compile_while_busy_is_rejected() {
    let f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");
    let runner = producing(&output);
    let d = dispatcher(runner.clone(), &[ToolchainId::Ps2Exe]);

    {
      let _guard = d.begin().unwrap();
      let result = d.compile(&request(source.clone(), output.clone()), &f.env());
      assert!(matches!(result.failure, Some(CompileFailure::Busy)));
      assert!(runner.commands().is_empty());
      assert!(f.history().entries().is_empty());
      assert_eq!(d.phase(), Phase::Preparing);
    }

    assert_eq!(d.phase(), Phase::Failed);
    assert!(d.compile(&request(source, output), &f.env()).is_success());
  }

  #[test]
  fn post_build_action_runs_and_failures_are_warnings() {
    let mut f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");
    let runner = producing(&output);

    f.settings.post_build_action = PostBuildAction::OpenFolder;
    let result = dispatcher(runner.clone(), &[ToolchainId::Ps2Exe]).compile(&request(source.clone(), output.clone()), &f.env());
    assert!(result.is_success());
    assert_eq!(runner.launched().len(), 1);

    f.settings.post_build_action = PostBuildAction::CopyToFolder;
    let result = dispatcher(runner, &[ToolchainId::Ps2Exe]).compile(&request(source, output), &f.env());
    assert!(result.is_success());
    assert!(result.warnings.iter().any(|w| w.contains("no copy destination")));
  }

  #[test]
  fn notice_follows_settings() {
    let mut f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");

    let result = dispatcher(producing(&output), &[ToolchainId::Ps2Exe]).compile(&request(source.clone(), output.clone()), &f.env());
    let notice = result.notice.unwrap();
    assert!(notice.success);
    assert_eq!(notice.body, "script.exe is ready");

    f.settings.show_notifications = false;
    let result = dispatcher(producing(&output), &[ToolchainId::Ps2Exe]).compile(&request(source, output), &f.env());
    assert!(result.notice.is_none());
  }

  #[test]
  fn profile_options_reach_the_tool() {
    let f = Fixture::new();
    let source = f.source("script.ps1");
    let output = f.temp.path().join("script.exe");
    let runner = producing(&output);
    let mut req = request(source, output);
    req.options.profile_name = "Admin Tool".into();
    req.options.profile = BuildProfile {
      console: true,
      admin: true,
      ..BuildProfile::default()
    };

    let result = dispatcher(runner.clone(), &[ToolchainId::Ps2Exe]).compile(&req, &f.env());
    assert!(result.is_success());
    let script = &runner.commands()[0].args_lossy()[4];
    assert!(script.contains("-RequireAdmin"));
    assert!(!script.contains("-NoConsole"));
    assert_eq!(f.history().entries()[0].profile, "Admin Tool");
  }
}
