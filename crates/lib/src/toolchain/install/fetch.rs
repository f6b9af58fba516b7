//! Download and archive extraction for managed toolchains.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::TEMP_PREFIX;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to fetch {url}: {message}")]
  Http { url: String, message: String },

  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error("unsupported archive format: {0}")]
  UnsupportedArchive(String),

  #[error("invalid zip archive: {0}")]
  Zip(String),

  #[error("unsafe archive entry: {0}")]
  UnsafeEntry(String),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

/// Download `url` into a uniquely named file under `dir`.
///
/// The file keeps the URL's file name as a suffix so the archive format can
/// be recognised, and is deleted when the returned path is dropped.
pub fn download(url: &str, expected_sha256: Option<&str>, dir: &Path) -> Result<TempPath, FetchError> {
  info!(url = %url, "fetching URL");

  let http = |message: String| FetchError::Http {
    url: url.to_string(),
    message,
  };

  let response = reqwest::blocking::get(url).map_err(|e| http(e.to_string()))?;
  if !response.status().is_success() {
    return Err(http(format!("HTTP {}", response.status())));
  }
  let bytes = response.bytes().map_err(|e| http(e.to_string()))?;

  if let Some(expected) = expected_sha256 {
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected) {
      return Err(FetchError::HashMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual,
      });
    }
    debug!(sha256 = %actual, "hash verified");
  }

  let mut file = tempfile::Builder::new()
    .prefix(TEMP_PREFIX)
    .suffix(&format!("-{}", url_to_filename(url)))
    .tempfile_in(dir)?;
  file.write_all(&bytes)?;
  file.flush()?;

  info!(path = ?file.path(), size = bytes.len(), "download complete");
  // Close the handle so installers can be executed on Windows.
  Ok(file.into_temp_path())
}

/// Last path segment of `url`, sanitized for use in a file name.
pub fn url_to_filename(url: &str) -> String {
  let last = url.rsplit('/').next().unwrap_or_default();
  let last = last.split('?').next().unwrap_or(last);

  let sanitized: String = last
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect();

  if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    return format!("download_{}", &hex::encode(hasher.finalize())[..16]);
  }
  sanitized
}

/// Unpack a `.zip`, `.tar.gz`/`.tgz` or `.tar` archive into `dest`, dropping
/// the archive's top-level directory.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<(), FetchError> {
  let name = archive_path.to_string_lossy().to_ascii_lowercase();

  fs::create_dir_all(dest)?;

  if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
    let file = File::open(archive_path)?;
    unpack_tar(Archive::new(GzDecoder::new(BufReader::new(file))), dest)?;
  } else if name.ends_with(".tar") {
    let file = File::open(archive_path)?;
    unpack_tar(Archive::new(BufReader::new(file)), dest)?;
  } else if name.ends_with(".zip") {
    unpack_zip(archive_path, dest)?;
  } else {
    return Err(FetchError::UnsupportedArchive(name));
  }

  info!(dest = %dest.display(), "unpacked archive");
  Ok(())
}

fn strip_first(path: &Path) -> Option<PathBuf> {
  let stripped: PathBuf = path.components().skip(1).collect();
  (!stripped.as_os_str().is_empty()).then_some(stripped)
}

/// True when `path` stays below the directory it is joined onto.
fn is_enclosed(path: &Path) -> bool {
  path
    .components()
    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn unpack_tar<R: io::Read>(mut archive: Archive<R>, dest: &Path) -> Result<(), FetchError> {
  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.into_owned();
    if !is_enclosed(&path) {
      return Err(FetchError::UnsafeEntry(path.display().to_string()));
    }
    let Some(stripped) = strip_first(&path) else {
      continue;
    };

    let dest_path = dest.join(&stripped);
    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }
    entry.unpack(&dest_path)?;
  }
  Ok(())
}

fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<(), FetchError> {
  let file = File::open(archive_path)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| FetchError::Zip(e.to_string()))?;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(|e| FetchError::Zip(e.to_string()))?;
    let path = entry
      .enclosed_name()
      .ok_or_else(|| FetchError::Zip(format!("unsafe entry name: {}", entry.name())))?;
    let Some(stripped) = strip_first(&path) else {
      continue;
    };

    let dest_path = dest.join(&stripped);
    if entry.is_dir() {
      fs::create_dir_all(&dest_path)?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut outfile = File::create(&dest_path)?;
    io::copy(&mut entry, &mut outfile)?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
      }
    }
  }
  Ok(())
}
