//! Toolchain registry.
//!
//! A static catalog of the external compilers and packagers exeforge can
//! drive, keyed by source-file extension. Each [`ToolchainDescriptor`]
//! carries its capabilities plus the data that drives probing
//! ([`ProbeSpec`]) and installation ([`InstallSpec`]).

pub mod host;
pub mod install;
pub mod probe;
pub mod types;

use std::path::Path;

pub use host::{HostEnv, SearchPath};
pub use install::{InstallOutcome, InstallRecipe, InstallSpec, Installer, SystemInstaller};
pub use probe::{Fallback, Listing, ProbeSpec, ProbeStatus, Prober, Runtime, SystemProber};
pub use types::{RegistryError, SizeEstimate, ToolchainId};

use crate::consts::{AUTOHOTKEY_VERSION, GO_VERSION};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Static description of one compilation backend.
#[derive(Debug)]
pub struct ToolchainDescriptor {
  pub id: ToolchainId,
  /// Public name of the tool, e.g. `PyInstaller`.
  pub display_name: &'static str,
  /// Source language, e.g. `Python`.
  pub language: &'static str,
  pub description: &'static str,
  pub extensions: &'static [&'static str],
  /// Produced executables can request elevation.
  pub requires_elevation_capable: bool,
  /// Console window visibility of produced executables is configurable.
  pub supports_console_toggle: bool,
  /// Ships with the OS; never probed for install, never installed.
  pub built_in: bool,
  pub probe: ProbeSpec,
  pub install: Option<InstallSpec>,
  pub size_estimate: SizeEstimate,
}

impl ToolchainDescriptor {
  pub fn accepts(&self, ext: &str) -> bool {
    let ext = normalize_ext(ext);
    self.extensions.iter().any(|e| *e == ext)
  }
}

static REGISTRY: [ToolchainDescriptor; 8] = [
  ToolchainDescriptor {
    id: ToolchainId::Ps2Exe,
    display_name: "PS2EXE",
    language: "PowerShell",
    description: "PowerShell Script",
    extensions: &["ps1"],
    requires_elevation_capable: true,
    supports_console_toggle: true,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &[],
      fallbacks: &[],
      runtime: Some(Runtime::PowerShell),
      listing: Some(Listing {
        args: &["-NoProfile", "-Command", "Get-Module -ListAvailable ps2exe"],
        needle: "ps2exe",
      }),
    },
    install: Some(InstallSpec::Package {
      runtime: Runtime::PowerShell,
      args: &[
        "-NoProfile",
        "-ExecutionPolicy",
        "Bypass",
        "-Command",
        "Install-Module ps2exe -Scope CurrentUser -Force",
      ],
    }),
    size_estimate: SizeEstimate::new(5 * MIB, 1.5),
  },
  ToolchainDescriptor {
    id: ToolchainId::PyInstaller,
    display_name: "PyInstaller",
    language: "Python",
    description: "Python Script",
    extensions: &["py"],
    requires_elevation_capable: false,
    supports_console_toggle: true,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &["pyinstaller"],
      fallbacks: &[],
      runtime: Some(Runtime::Python),
      listing: Some(Listing {
        args: &["-m", "pip", "show", "pyinstaller"],
        needle: "pyinstaller",
      }),
    },
    install: Some(InstallSpec::Package {
      runtime: Runtime::Python,
      args: &["-m", "pip", "install", "--user", "pyinstaller"],
    }),
    size_estimate: SizeEstimate::new(15 * MIB, 2.0),
  },
  ToolchainDescriptor {
    id: ToolchainId::IExpress,
    display_name: "IExpress",
    language: "Batch/VBScript",
    description: "Batch, Command or VBScript file",
    extensions: &["bat", "cmd", "vbs"],
    requires_elevation_capable: false,
    supports_console_toggle: false,
    built_in: true,
    probe: ProbeSpec::SystemFile(&["System32/iexpress.exe"]),
    install: None,
    size_estimate: SizeEstimate::new(50 * KIB, 1.2),
  },
  ToolchainDescriptor {
    id: ToolchainId::Pkg,
    display_name: "pkg",
    language: "Node.js",
    description: "JavaScript",
    extensions: &["js"],
    requires_elevation_capable: false,
    supports_console_toggle: false,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &["pkg"],
      fallbacks: &[Fallback::AppData("npm/pkg.cmd")],
      runtime: Some(Runtime::Node),
      listing: None,
    },
    install: Some(InstallSpec::Package {
      runtime: Runtime::Node,
      args: &["install", "-g", "pkg"],
    }),
    size_estimate: SizeEstimate::new(40 * MIB, 1.5),
  },
  ToolchainDescriptor {
    id: ToolchainId::Ahk2Exe,
    display_name: "Ahk2Exe",
    language: "AutoHotkey",
    description: "AutoHotkey Script",
    extensions: &["ahk"],
    requires_elevation_capable: false,
    supports_console_toggle: false,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &[],
      fallbacks: &[
        Fallback::ProgramFiles("AutoHotkey/Compiler/Ahk2Exe.exe"),
        Fallback::ProgramFiles("AutoHotkey/v2/Compiler/Ahk2Exe.exe"),
        Fallback::ProgramFilesX86("AutoHotkey/Compiler/Ahk2Exe.exe"),
        Fallback::Managed("AutoHotkey/Compiler/Ahk2Exe.exe"),
      ],
      runtime: None,
      listing: None,
    },
    install: Some(InstallSpec::SilentInstaller {
      url: "https://www.autohotkey.com/download/1.1/AutoHotkey_{version}_setup.exe",
      version: AUTOHOTKEY_VERSION,
      args: &["/S"],
      dir_flag: "/D=",
      dir_name: "AutoHotkey",
      binary: "Compiler/Ahk2Exe.exe",
      bin_dir: "Compiler",
    }),
    size_estimate: SizeEstimate::new(MIB, 1.3),
  },
  ToolchainDescriptor {
    id: ToolchainId::Csc,
    display_name: "CSC",
    language: "C#",
    description: "C# Source",
    extensions: &["cs"],
    requires_elevation_capable: false,
    supports_console_toggle: true,
    built_in: true,
    probe: ProbeSpec::SystemFile(&[
      "Microsoft.NET/Framework64/v4.0.30319/csc.exe",
      "Microsoft.NET/Framework/v4.0.30319/csc.exe",
    ]),
    install: None,
    size_estimate: SizeEstimate::new(10 * KIB, 1.1),
  },
  ToolchainDescriptor {
    id: ToolchainId::GoBuild,
    display_name: "Go",
    language: "Go",
    description: "Go Source",
    extensions: &["go"],
    requires_elevation_capable: false,
    supports_console_toggle: true,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &["go"],
      fallbacks: &[
        Fallback::LocalAppData("Programs/Go/bin/go.exe"),
        Fallback::Managed("go/bin/go.exe"),
        Fallback::Managed("go/bin/go"),
      ],
      runtime: None,
      listing: None,
    },
    install: Some(InstallSpec::Archive {
      url: "https://go.dev/dl/go{version}.{platform}.{ext}",
      version: GO_VERSION,
      dir_name: "go",
      binary: "bin/go",
      bin_dir: "bin",
    }),
    size_estimate: SizeEstimate::new(2 * MIB, 1.2),
  },
  ToolchainDescriptor {
    id: ToolchainId::Ocra,
    display_name: "Ocra",
    language: "Ruby",
    description: "Ruby Script",
    extensions: &["rb"],
    requires_elevation_capable: false,
    supports_console_toggle: true,
    built_in: false,
    probe: ProbeSpec::Tool {
      binaries: &["ocra"],
      fallbacks: &[],
      runtime: Some(Runtime::Ruby),
      listing: Some(Listing {
        args: &["list", "ocra"],
        needle: "ocra",
      }),
    },
    install: Some(InstallSpec::Package {
      runtime: Runtime::Ruby,
      args: &["install", "ocra"],
    }),
    size_estimate: SizeEstimate::new(20 * MIB, 2.0),
  },
];

/// All registered toolchains in display order.
pub fn all() -> &'static [ToolchainDescriptor] {
  &REGISTRY
}

/// Descriptor for a toolchain id.
pub fn descriptor(id: ToolchainId) -> &'static ToolchainDescriptor {
  let index = match id {
    ToolchainId::Ps2Exe => 0,
    ToolchainId::PyInstaller => 1,
    ToolchainId::IExpress => 2,
    ToolchainId::Pkg => 3,
    ToolchainId::Ahk2Exe => 4,
    ToolchainId::Csc => 5,
    ToolchainId::GoBuild => 6,
    ToolchainId::Ocra => 7,
  };
  &REGISTRY[index]
}

/// Resolve the toolchain that owns `ext` (`"py"`, `".PY"` ...).
pub fn resolve(ext: &str) -> Result<&'static ToolchainDescriptor, RegistryError> {
  REGISTRY
    .iter()
    .find(|d| d.accepts(ext))
    .ok_or_else(|| RegistryError::NotFound(normalize_ext(ext)))
}

/// Resolve the toolchain for a source file by its extension.
pub fn resolve_path(path: &Path) -> Result<&'static ToolchainDescriptor, RegistryError> {
  let ext = extension_of(path).ok_or_else(|| RegistryError::NoExtension(path.to_path_buf()))?;
  resolve(&ext)
}

/// Lowercased extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
  path
    .extension()
    .map(|e| e.to_string_lossy().to_ascii_lowercase())
    .filter(|e| !e.is_empty())
}

/// Every extension any toolchain accepts.
pub fn supported_extensions() -> Vec<&'static str> {
  REGISTRY.iter().flat_map(|d| d.extensions.iter().copied()).collect()
}

/// Estimated size of the executable produced from `source`.
///
/// Returns `None` when the file is missing or its type is unsupported.
pub fn estimate_output_size(source: &Path) -> Option<u64> {
  let descriptor = resolve_path(source).ok()?;
  let len = std::fs::metadata(source).ok()?.len();
  Some(descriptor.size_estimate.estimate(len))
}

fn normalize_ext(ext: &str) -> String {
  ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
