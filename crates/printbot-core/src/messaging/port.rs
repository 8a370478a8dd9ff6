use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{MessagingCapabilities, RemoteFile},
    Result,
};

/// Outbound side of the messaging channel.
///
/// Implementations report delivery problems as `Error::SendFailed`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Send `text` as a reply threaded under `to`.
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef>;
}

/// Attachment side of the messaging channel.
///
/// Downloads are a two-step exchange: a file id is first resolved to a
/// channel-side path, then the bytes behind that path are streamed out.
#[async_trait]
pub trait FilePort: Send + Sync {
    async fn resolve(&self, file_id: &str) -> Result<RemoteFile>;

    async fn download(
        &self,
        file: &RemoteFile,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()>;
}
