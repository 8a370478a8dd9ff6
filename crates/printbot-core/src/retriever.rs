use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    cleanup::CleanupGuard,
    errors::Error,
    messaging::{
        port::FilePort,
        types::{InboundAttachment, RemoteFile},
    },
    storage::{StoredFile, TransientStorage},
    Result,
};

/// Downloads channel attachments into the transient storage area.
#[derive(Clone)]
pub struct AttachmentRetriever {
    storage: TransientStorage,
    files: Arc<dyn FilePort>,
    max_file_size: u64,
}

impl AttachmentRetriever {
    pub fn new(storage: TransientStorage, files: Arc<dyn FilePort>, max_file_size: u64) -> Self {
        Self {
            storage,
            files,
            max_file_size,
        }
    }

    /// Resolve and download `attachment` into a fresh per-request path.
    ///
    /// Every failure is `Error::RetrievalFailed`, and nothing is left on disk when it happens.
    pub async fn retrieve(&self, attachment: &InboundAttachment) -> Result<StoredFile> {
        let remote = self
            .files
            .resolve(&attachment.file_id)
            .await
            .map_err(|e| {
                Error::RetrievalFailed(format!("could not resolve file: {}", cause(&e)))
            })?;

        if let Some(size) = remote.size.or(attachment.size) {
            if size > self.max_file_size {
                return Err(Error::RetrievalFailed(format!(
                    "file is too large ({} bytes, limit is {} bytes)",
                    size, self.max_file_size
                )));
            }
        }

        let stored = self
            .storage
            .allocate(&attachment.display_name)
            .await
            .map_err(|e| {
                Error::RetrievalFailed(format!("could not prepare storage: {}", cause(&e)))
            })?;

        let guard = CleanupGuard::new(stored);
        if let Err(e) = self.write_into(&guard, &remote).await {
            guard.release().await;
            return Err(Error::RetrievalFailed(cause(&e)));
        }

        info!(
            file_id = %attachment.file_id,
            path = %guard.path().display(),
            "attachment downloaded"
        );
        guard
            .into_inner()
            .ok_or_else(|| Error::RetrievalFailed("stored file went missing".to_string()))
    }

    async fn write_into(&self, guard: &CleanupGuard, remote: &RemoteFile) -> Result<()> {
        // create_new: never silently overwrite an existing file.
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(guard.path())
            .await?;
        // The size check above is skipped when the channel reports no size.
        let mut dst = SizeLimited::new(file, self.max_file_size);
        self.files.download(remote, &mut dst).await?;
        dst.flush().await?;
        debug!(channel_path = %remote.path, "download finished");
        Ok(())
    }
}

/// Error text without the `Error` variant prefix, for user-facing causes.
fn cause(e: &Error) -> String {
    match e {
        Error::External(m) | Error::RetrievalFailed(m) => m.clone(),
        Error::Io(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// Writer that fails once more than `limit` bytes have been written through it.
struct SizeLimited<W> {
    inner: W,
    written: u64,
    limit: u64,
}

impl<W> SizeLimited<W> {
    fn new(inner: W, limit: u64) -> Self {
        Self {
            inner,
            written: 0,
            limit,
        }
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for SizeLimited<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.written.saturating_add(buf.len() as u64) > this.limit {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                format!("file is too large (limit is {} bytes)", this.limit),
            )));
        }
        let res = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &res {
            this.written += *n as u64;
        }
        res
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
