use std::{
    fs, io,
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{errors::Error, messaging::types::DEFAULT_DISPLAY_NAME, Result};

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

const REQUEST_DIR_PREFIX: &str = "req-";
const KEEP_FILE: &str = ".keep";
/// Well under the 255-byte file name limit of common filesystems.
const MAX_NAME_BYTES: usize = 200;
const ALLOCATE_ATTEMPTS: usize = 8;

/// Working directory for in-flight downloads.
///
/// Every request gets its own `req-*` subdirectory, so two concurrent uploads
/// named `report.pdf` never share a path and cleanup of one cannot touch the
/// other.
#[derive(Clone, Debug)]
pub struct TransientStorage {
    root: PathBuf,
}

/// A downloaded attachment, exclusively owned by one request.
#[derive(Debug, PartialEq, Eq)]
pub struct StoredFile {
    path: PathBuf,
    request_dir: PathBuf,
}

impl StoredFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn request_dir(&self) -> &Path {
        &self.request_dir
    }

    /// Remove the file and its request directory. Already gone counts as removed.
    pub(crate) async fn remove(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.request_dir).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    pub(crate) fn remove_blocking(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.request_dir) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl TransientStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if needed and prove it is writable. Idempotent.
    pub fn ensure_ready(&self) -> Result<()> {
        let unavailable = |reason: String| Error::StorageUnavailable {
            path: self.root.clone(),
            reason,
        };

        fs::create_dir_all(&self.root)
            .map_err(|e| unavailable(format!("cannot create directory: {e}")))?;

        let md = fs::metadata(&self.root).map_err(|e| unavailable(e.to_string()))?;
        if !md.is_dir() {
            return Err(unavailable("not a directory".to_string()));
        }

        fs::write(self.root.join(KEEP_FILE), b"")
            .map_err(|e| unavailable(format!("directory is not writable: {e}")))?;

        debug!(root = %self.root.display(), "transient storage ready");
        Ok(())
    }

    /// Remove request directories left behind by a previous run. Returns how many were removed.
    ///
    /// Only call this before messages are being handled.
    pub fn sweep_stale(&self) -> usize {
        let Ok(rd) = fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in rd.flatten() {
            if !is_request_dir_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "failed to remove stale request dir"
                ),
            }
        }

        if removed > 0 {
            info!(removed, "swept stale request directories");
        }
        removed
    }

    /// Reserve a fresh, collision-free path for `display_name`.
    ///
    /// Creates the per-request directory; the file itself is left for the caller to write.
    pub async fn allocate(&self, display_name: &str) -> Result<StoredFile> {
        let name = sanitize_display_name(display_name);
        ensure_single_component(&name)?;

        for _ in 0..ALLOCATE_ATTEMPTS {
            let request_dir = self.root.join(next_request_dir_name());
            match tokio::fs::create_dir(&request_dir).await {
                Ok(()) => {
                    return Ok(StoredFile {
                        path: request_dir.join(&name),
                        request_dir,
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::External(
            "could not allocate a unique request directory".to_string(),
        ))
    }
}

fn next_request_dir_name() -> String {
    let ts = Utc::now().timestamp_millis();
    let n = REQUEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{REQUEST_DIR_PREFIX}{ts}-{n}")
}

/// True only for names shaped exactly like `next_request_dir_name` output.
fn is_request_dir_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(REQUEST_DIR_PREFIX) else {
        return false;
    };
    let Some((ts, n)) = rest.split_once('-') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(ts) && digits(n)
}

/// Reduce an untrusted file name to a single safe path component.
///
/// Directory parts (either separator), control characters and leading dots are
/// dropped. Non-ASCII names are kept as-is.
pub fn sanitize_display_name(name: &str) -> String {
    let last = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim_start();

    let mut out = String::with_capacity(cleaned.len().min(MAX_NAME_BYTES));
    for ch in cleaned.chars() {
        if out.len() + ch.len_utf8() > MAX_NAME_BYTES {
            break;
        }
        out.push(ch);
    }
    let out = out.trim_end();

    if out.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        out.to_string()
    }
}

fn ensure_single_component(name: &str) -> Result<()> {
    let mut comps = Path::new(name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidPath {
            path: PathBuf::from(name),
            reason: "must be a single file name".to_string(),
        }),
    }
}
