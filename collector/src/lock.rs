use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use trendwatch_core::{Error, Result};

/// Exclusive marker file held for the length of one ingestion run.
///
/// Acquisition uses create-new semantics, so a second run against the same
/// dataset fails instead of interleaving with the first. The file is removed
/// on drop. A run killed without unwinding leaves the file behind; it names
/// the owning pid and has to be removed by hand.
#[derive(Debug)]
pub struct RunGuard {
    path: PathBuf,
}

impl RunGuard {
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let owner = fs::read_to_string(&path).unwrap_or_default();
                return Err(Error::AlreadyRunning(format!(
                    "{} held by pid {}",
                    path.display(),
                    owner.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!(lock = %path.display(), "run lock acquired");
        Ok(Self { path })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
