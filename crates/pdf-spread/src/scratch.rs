//! Process-scoped scratch storage for page units
//!
//! Unit files live in one directory under the system temp dir. The directory
//! is created on first use, every file is recorded in a registry, and a
//! [`ScratchGuard`] sweeps whatever is still registered on orderly shutdown.
//! Files left behind by a crash are not reclaimed.

use crate::constants::{SCRATCH_DIR_NAME, UNIT_FILE_PREFIX, UNIT_FILE_SUFFIX};
use crate::types::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use tempfile::TempPath;

static GLOBAL: OnceLock<Scratch> = OnceLock::new();

/// Registry of scratch files
#[derive(Debug)]
pub struct Scratch {
    dir: PathBuf,
    live: Mutex<HashSet<PathBuf>>,
}

impl Scratch {
    /// A scratch area rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            live: Mutex::new(HashSet::new()),
        }
    }

    /// The process-wide scratch area at `<tmp>/pdf-spread`
    pub fn global() -> &'static Scratch {
        GLOBAL.get_or_init(|| Scratch::new(std::env::temp_dir().join(SCRATCH_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new, uniquely named, empty file and register it.
    ///
    /// The returned path deletes its file when dropped.
    pub fn allocate(&self) -> Result<TempPath> {
        std::fs::create_dir_all(&self.dir)?;
        let path = tempfile::Builder::new()
            .prefix(UNIT_FILE_PREFIX)
            .suffix(UNIT_FILE_SUFFIX)
            .tempfile_in(&self.dir)?
            .into_temp_path();
        self.registry().insert(path.to_path_buf());
        Ok(path)
    }

    /// Forget a file that its owner is about to delete
    pub fn release(&self, path: &Path) {
        self.registry().remove(path);
    }

    /// Number of registered files
    pub fn live_count(&self) -> usize {
        self.registry().len()
    }

    /// Delete every registered file.
    ///
    /// Only call this when no page unit is in use any more.
    pub fn sweep(&self) -> usize {
        let paths: Vec<PathBuf> = self.registry().drain().collect();
        let mut removed = 0;
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        if removed > 0 {
            log::debug!("Swept {} scratch file(s) from {}", removed, self.dir.display());
        }
        removed
    }

    /// A guard that sweeps this scratch area when dropped
    pub fn guard(&'static self) -> ScratchGuard {
        ScratchGuard { scratch: self }
    }

    fn registry(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // A panic while holding the lock cannot leave the set half-updated
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Sweeps its scratch area on drop
#[must_use = "the scratch area is swept when the guard is dropped"]
pub struct ScratchGuard {
    scratch: &'static Scratch,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        self.scratch.sweep();
    }
}
