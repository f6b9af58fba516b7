//! Per-toolchain invocation strategies.
//!
//! Each strategy maps the generic build options onto one tool's command
//! line. Strategies only build commands; the dispatcher runs them.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::types::CompileFailure;
use crate::consts::TEMP_PREFIX;
use crate::exec::{ToolCommand, ps_quote, ps_quote_path};
use crate::state::BuildProfile;
use crate::toolchain::{HostEnv, Runtime, ToolchainId};

/// A prepared tool run.
#[derive(Debug)]
pub struct Invocation {
  pub command: ToolCommand,
  /// Scratch directory that must outlive the run; removed on drop.
  pub staging: Option<TempDir>,
}

impl Invocation {
  fn direct(command: ToolCommand) -> Self {
    Self { command, staging: None }
  }
}

/// Inputs common to every strategy.
pub struct StrategyInput<'a> {
  pub source: &'a Path,
  pub output: &'a Path,
  /// Icon that is known to exist.
  pub icon: Option<&'a Path>,
  pub profile: &'a BuildProfile,
  /// Where the probe found the tool or its runtime.
  pub location: Option<&'a Path>,
  pub host: &'a HostEnv,
}

impl StrategyInput<'_> {
  fn tool_or(&self, name: &str) -> PathBuf {
    self
      .location
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from(name))
  }
}

pub trait InvocationStrategy: Sync {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure>;
}

impl ToolchainId {
  pub fn strategy(self) -> &'static dyn InvocationStrategy {
    match self {
      Self::Ps2Exe => &Ps2ExeModule,
      Self::PyInstaller => &PyInstallerCli,
      Self::IExpress => &IExpressPackager,
      Self::Pkg => &PkgCli,
      Self::Ahk2Exe => &Ahk2ExeCli,
      Self::Csc => &CscCli,
      Self::GoBuild => &GoBuild,
      Self::Ocra => &OcraCli,
    }
  }
}

fn staging_dir() -> Result<TempDir, CompileFailure> {
  tempfile::Builder::new()
    .prefix(TEMP_PREFIX)
    .tempdir()
    .map_err(|e| CompileFailure::Staging(e.to_string()))
}

/// `Invoke-PS2EXE` through PowerShell.
pub struct Ps2ExeModule;

impl Ps2ExeModule {
  fn script(input: &StrategyInput<'_>) -> String {
    let profile = input.profile;
    let mut script = format!(
      "Import-Module ps2exe; Invoke-PS2EXE -InputFile {} -OutputFile {}",
      ps_quote_path(input.source),
      ps_quote_path(input.output)
    );
    if let Some(icon) = input.icon {
      script.push_str(&format!(" -IconFile {}", ps_quote_path(icon)));
    }
    if profile.admin {
      script.push_str(" -RequireAdmin");
    }
    if !profile.console {
      script.push_str(" -NoConsole");
    }
    let metadata = [
      ("Title", &profile.product),
      ("Version", &profile.version),
      ("Company", &profile.company),
      ("Copyright", &profile.copyright),
      ("Description", &profile.description),
    ];
    for (flag, value) in metadata {
      if !value.trim().is_empty() {
        script.push_str(&format!(" -{} {}", flag, ps_quote(value.trim())));
      }
    }
    script
  }
}

impl InvocationStrategy for Ps2ExeModule {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let powershell = input
      .location
      .map(Path::to_path_buf)
      .or_else(|| Runtime::PowerShell.locate(input.host))
      .unwrap_or_else(|| PathBuf::from("powershell"));
    let command = input
      .host
      .command(powershell)
      .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
      .arg(Self::script(input));
    Ok(Invocation::direct(command))
  }
}

/// IExpress driven by a synthesized SED directive file.
pub struct IExpressPackager;

impl IExpressPackager {
  fn launcher(file_name: &str) -> String {
    let is_vbs = Path::new(file_name)
      .extension()
      .is_some_and(|e| e.eq_ignore_ascii_case("vbs"));
    if is_vbs {
      format!("wscript \"{}\"", file_name)
    } else {
      format!("cmd /c \"{}\"", file_name)
    }
  }

  /// SED directive packaging `file_name` from `staging` into `output`.
  pub fn sed(output: &Path, staging: &Path, file_name: &str) -> String {
    let mut source_dir = staging.display().to_string();
    if !source_dir.ends_with('\\') {
      source_dir.push('\\');
    }
    let lines = [
      "[Version]".to_string(),
      "Class=IEXPRESS".to_string(),
      "SEDVersion=3".to_string(),
      "[Options]".to_string(),
      "PackagePurpose=InstallApp".to_string(),
      "ShowInstallProgramWindow=0".to_string(),
      "HideExtractAnimation=1".to_string(),
      "UseLongFileName=1".to_string(),
      "InsideCompressed=0".to_string(),
      "CAB_FixedSize=0".to_string(),
      "RebootMode=N".to_string(),
      format!("TargetName={}", output.display()),
      "FriendlyName=App".to_string(),
      format!("AppLaunched={}", Self::launcher(file_name)),
      "PostInstallCmd=<None>".to_string(),
      "SourceFiles=SourceFiles".to_string(),
      "[Strings]".to_string(),
      "[SourceFiles]".to_string(),
      format!("SourceFiles0={}", source_dir),
      "[SourceFiles0]".to_string(),
      format!("%FILE0%={}", file_name),
    ];
    let mut sed = lines.join("\r\n");
    sed.push_str("\r\n");
    sed
  }
}

impl InvocationStrategy for IExpressPackager {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let staging = staging_dir()?;
    let file_name = input
      .source
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .ok_or_else(|| CompileFailure::Staging(format!("invalid source path: {}", input.source.display())))?;

    let stage = || -> std::io::Result<PathBuf> {
      fs::copy(input.source, staging.path().join(&file_name))?;
      let sed_path = staging.path().join("config.sed");
      fs::write(&sed_path, Self::sed(input.output, staging.path(), &file_name))?;
      Ok(sed_path)
    };
    let sed_path = stage().map_err(|e| CompileFailure::Staging(e.to_string()))?;

    let iexpress = input
      .location
      .map(Path::to_path_buf)
      .unwrap_or_else(|| input.host.windir.join("System32").join("iexpress.exe"));
    let command = input.host.command(iexpress).args(["/N", "/Q"]).arg(sed_path);
    Ok(Invocation {
      command,
      staging: Some(staging),
    })
  }
}

/// PyInstaller, falling back to `python -m PyInstaller` when only the
/// module is installed.
pub struct PyInstallerCli;

impl InvocationStrategy for PyInstallerCli {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let host = input.host;
    let command = match (host.find_any(&["pyinstaller"]), Runtime::Python.locate(host)) {
      (Some(bin), _) => host.command(bin),
      (None, Some(python)) => host.command(python).args(["-m", "PyInstaller"]),
      (None, None) => host.command("pyinstaller"),
    };

    let staging = staging_dir()?;
    let dist = input.output.parent().unwrap_or(Path::new("."));
    let name = input
      .output
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "app".to_string());

    let command = command
      .arg("--distpath")
      .arg(dist)
      .arg("--workpath")
      .arg(staging.path().join("build"))
      .arg("--specpath")
      .arg(staging.path())
      .args(["--name", name.as_str(), "--noconfirm"])
      .arg_if(input.profile.single_file, "--onefile")
      .arg_if(!input.profile.console, "--noconsole");
    let command = match input.icon {
      Some(icon) => command.arg("--icon").arg(icon),
      None => command,
    };

    Ok(Invocation {
      command: command.arg(input.source),
      staging: Some(staging),
    })
  }
}

/// `pkg` for Node.js.
pub struct PkgCli;

pub const PKG_TARGET: &str = "node18-win-x64";

impl InvocationStrategy for PkgCli {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let command = input
      .host
      .command(input.tool_or("pkg"))
      .arg(input.source)
      .args(["--target", PKG_TARGET, "--output"])
      .arg(input.output);
    Ok(Invocation::direct(command))
  }
}

/// The .NET Framework C# compiler.
pub struct CscCli;

impl InvocationStrategy for CscCli {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let mut out = std::ffi::OsString::from("/out:");
    out.push(input.output);

    let command = input
      .host
      .command(input.tool_or("csc"))
      .arg("/nologo")
      .arg(out)
      .arg_if(!input.profile.console, "/target:winexe");
    let command = match input.icon {
      Some(icon) => {
        let mut flag = std::ffi::OsString::from("/win32icon:");
        flag.push(icon);
        command.arg(flag)
      }
      None => command,
    };
    Ok(Invocation::direct(command.arg(input.source)))
  }
}

/// `go build`, run from the source's directory.
pub struct GoBuild;

impl InvocationStrategy for GoBuild {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let gui = !input.profile.console && input.host.targets_windows();
    let mut command = input
      .host
      .command(input.tool_or("go"))
      .args(["build", "-o"])
      .arg(input.output);
    if gui {
      command = command.args(["-ldflags", "-H=windowsgui"]);
    }
    let mut command = command.arg(input.source);
    if let Some(dir) = input.source.parent().filter(|d| !d.as_os_str().is_empty()) {
      command = command.current_dir(dir);
    }
    Ok(Invocation::direct(command))
  }
}

/// AutoHotkey's Ahk2Exe.
pub struct Ahk2ExeCli;

impl InvocationStrategy for Ahk2ExeCli {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let command = input
      .host
      .command(input.tool_or("Ahk2Exe"))
      .arg("/in")
      .arg(input.source)
      .arg("/out")
      .arg(input.output);
    let command = match input.icon {
      Some(icon) => command.arg("/icon").arg(icon),
      None => command,
    };
    Ok(Invocation::direct(command))
  }
}

/// Ocra for Ruby. The probe may have found only `gem`, so the tool itself
/// is looked up again.
pub struct OcraCli;

impl InvocationStrategy for OcraCli {
  fn prepare(&self, input: &StrategyInput<'_>) -> Result<Invocation, CompileFailure> {
    let ocra = input
      .host
      .find_any(&["ocra"])
      .unwrap_or_else(|| PathBuf::from("ocra"));
    let command = input
      .host
      .command(ocra)
      .arg(input.source)
      .arg("--output")
      .arg(input.output)
      .arg(if input.profile.console { "--console" } else { "--windows" });
    Ok(Invocation::direct(command))
  }
}
