use crate::domain::MessageRef;

/// Incoming update, already classified by kind.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Start(CommandMessage),
    Document(DocumentMessage),
    Other(OtherMessage),
}

#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub message: MessageRef,
    pub username: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DocumentMessage {
    pub message: MessageRef,
    pub username: Option<String>,
    pub attachment: InboundAttachment,
}

#[derive(Clone, Debug)]
pub struct OtherMessage {
    pub message: MessageRef,
    pub username: Option<String>,
}

/// Display name used when the channel does not report one.
pub const DEFAULT_DISPLAY_NAME: &str = "document";

/// A document as announced by the channel, before anything is downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundAttachment {
    pub file_id: String,
    /// Sender-provided file name. Untrusted.
    pub display_name: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
}

impl InboundAttachment {
    pub fn new(file_id: impl Into<String>, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        Self {
            file_id: file_id.into(),
            display_name,
            size: None,
            mime_type: None,
        }
    }
}

/// A file id resolved by the channel into something downloadable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_id: String,
    /// Channel-native path of the file (opaque to the core).
    pub path: String,
    pub size: Option<u64>,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_replies: bool,
    pub max_message_len: usize,
}

/// True for `/start`, `/start@SomeBot` and `/start <payload>`.
pub fn is_start_command(text: &str) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };
    let command = first.split_once('@').map(|(c, _)| c).unwrap_or(first);
    command == "/start"
}
