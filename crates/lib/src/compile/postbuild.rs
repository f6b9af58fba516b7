//! Actions run after a successful build.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::exec::ToolRunner;
use crate::state::PostBuildAction;
use crate::toolchain::HostEnv;

#[derive(Debug, Error)]
pub enum PostBuildError {
  #[error("no copy destination configured")]
  NoCopyDestination,

  #[error("failed to launch {what}: {source}")]
  Launch {
    what: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy to {}: {source}", dest.display())]
  Copy {
    dest: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Program that opens a folder in the desktop file manager.
fn folder_opener() -> &'static str {
  if cfg!(windows) {
    "explorer"
  } else if cfg!(target_os = "macos") {
    "open"
  } else {
    "xdg-open"
  }
}

/// Run `action` for `artifact`. Returns a line for the build log, if any.
pub fn run(
  action: PostBuildAction,
  artifact: &Path,
  copy_dir: &str,
  runner: &dyn ToolRunner,
  host: &HostEnv,
) -> Result<Option<String>, PostBuildError> {
  match action {
    PostBuildAction::None => Ok(None),

    PostBuildAction::OpenFolder => {
      let folder = artifact.parent().unwrap_or(Path::new("."));
      runner
        .launch(&host.command(folder_opener()).arg(folder))
        .map_err(|source| PostBuildError::Launch {
          what: folder.display().to_string(),
          source,
        })?;
      Ok(Some(format!("Opened {}", folder.display())))
    }

    PostBuildAction::RunExecutable => {
      let command = match artifact.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => host.command(artifact).current_dir(dir),
        _ => host.command(artifact),
      };
      runner.launch(&command).map_err(|source| PostBuildError::Launch {
        what: artifact.display().to_string(),
        source,
      })?;
      Ok(Some(format!("Launched {}", artifact.display())))
    }

    PostBuildAction::CopyToFolder => {
      if copy_dir.trim().is_empty() {
        return Err(PostBuildError::NoCopyDestination);
      }
      let dir = PathBuf::from(copy_dir.trim());
      let dest = dir.join(artifact.file_name().unwrap_or(artifact.as_os_str()));
      let copy = || -> io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        std::fs::copy(artifact, &dest).map(|_| ())
      };
      copy().map_err(|source| PostBuildError::Copy {
        dest: dest.clone(),
        source,
      })?;
      Ok(Some(format!("Copied to {}", dest.display())))
    }
  }
}
