use std::path::Path;

use tracing::{debug, warn};

use crate::storage::StoredFile;

/// Owns a [`StoredFile`] and deletes it when the request is done with it.
///
/// `release` removes it asynchronously; every normal exit path goes through it.
/// If the guard is dropped unreleased, which only happens when a panic unwinds
/// or the owning task is cancelled, `Drop` removes it synchronously with a
/// blocking `remove_dir_all` on the current thread. That is one small
/// directory, and removal has to finish before the guard is gone. Removal
/// failures are logged and never returned.
#[derive(Debug)]
pub struct CleanupGuard {
    // `None` only after `release`/`into_inner`, both of which consume the guard.
    file: Option<StoredFile>,
}

impl CleanupGuard {
    pub fn new(file: StoredFile) -> Self {
        Self { file: Some(file) }
    }

    pub fn path(&self) -> &Path {
        self.file.as_ref().map_or(Path::new(""), |f| f.path())
    }

    pub async fn release(mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        match file.remove().await {
            Ok(()) => debug!(path = %file.path().display(), "removed stored file"),
            Err(e) => warn!(
                path = %file.path().display(),
                error = %e,
                "failed to remove stored file"
            ),
        }
    }

    /// Hand the file back without deleting it.
    pub fn into_inner(mut self) -> Option<StoredFile> {
        self.file.take()
    }
}

impl Drop for CleanupGuard {
    // Fallback for panics and cancellation only.
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        match file.remove_blocking() {
            Ok(()) => debug!(path = %file.path().display(), "removed stored file on drop"),
            Err(e) => warn!(
                path = %file.path().display(),
                error = %e,
                "failed to remove stored file on drop"
            ),
        }
    }
}
