use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    cleanup::CleanupGuard,
    domain::{ChatId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{DocumentMessage, IncomingUpdate},
    },
    print::{PrintDispatcher, PrintOutcome},
    retriever::AttachmentRetriever,
    utils::truncate_text,
};

pub const GREETING: &str = "Hi! 👋\n\
I'm a printer bot.\n\
Just send me a document and I'll print it.";

pub const USAGE_PROMPT: &str = "Please send me a document to print.";

pub const UNEXPECTED_FAILURE_REPLY: &str = "❌ An unexpected error occurred. Please try again.";

const MAX_CAUSE_LEN: usize = 100;
const MAX_DIAGNOSTIC_LEN: usize = 1000;
const MAX_DETAILS_LEN: usize = 300;

/// The conversation handler: one call to [`PrintService::handle`] per inbound message.
///
/// Stateless across messages, so callers may run any number of `handle` futures
/// concurrently. Per-request failures become replies; nothing propagates.
#[derive(Clone)]
pub struct PrintService {
    messenger: Arc<dyn MessagingPort>,
    retriever: AttachmentRetriever,
    dispatcher: PrintDispatcher,
}

impl PrintService {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        retriever: AttachmentRetriever,
        dispatcher: PrintDispatcher,
    ) -> Self {
        Self {
            messenger,
            retriever,
            dispatcher,
        }
    }

    pub async fn handle(&self, update: IncomingUpdate) {
        match update {
            IncomingUpdate::Start(cmd) => {
                info!(chat_id = cmd.message.chat_id.0, "start command");
                self.send(cmd.message.chat_id, GREETING).await;
            }
            IncomingUpdate::Document(doc) => self.handle_document(doc).await,
            IncomingUpdate::Other(other) => self.reply(other.message, USAGE_PROMPT).await,
        }
    }

    async fn handle_document(&self, doc: DocumentMessage) {
        let chat_id = doc.message.chat_id;
        let name = doc.attachment.display_name.as_str();
        info!(
            chat_id = chat_id.0,
            user = doc.username.as_deref().unwrap_or("unknown"),
            file_id = %doc.attachment.file_id,
            file_name = %name,
            mime_type = doc.attachment.mime_type.as_deref().unwrap_or("unknown"),
            "document received"
        );

        // Acknowledge before any blocking work.
        self.send(
            chat_id,
            &format!("📄 Received file: {name}\nDownloading and sending it to the printer..."),
        )
        .await;

        let stored = match self.retriever.retrieve(&doc.attachment).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(chat_id = chat_id.0, file_name = %name, error = %e, "retrieval failed");
                self.send(chat_id, &retrieval_failed_reply(name, &e)).await;
                return;
            }
        };

        let guard = CleanupGuard::new(stored);
        let outcome = self.dispatcher.dispatch(guard.path()).await;
        guard.release().await;

        self.send(chat_id, &outcome_reply(name, &outcome)).await;
    }

    async fn send(&self, chat_id: ChatId, text: &str) {
        let text = self.fit_message(text);
        if let Err(e) = self.messenger.send_text(chat_id, &text).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }

    async fn reply(&self, to: MessageRef, text: &str) {
        let text = self.fit_message(text);
        let res = if self.messenger.capabilities().supports_replies {
            self.messenger.reply_text(to, &text).await
        } else {
            self.messenger.send_text(to.chat_id, &text).await
        };
        if let Err(e) = res {
            warn!(chat_id = to.chat_id.0, error = %e, "failed to send reply");
        }
    }

    /// Cut `text` down to what the channel accepts in one message.
    fn fit_message(&self, text: &str) -> String {
        // Leave room for the "..." that truncate_text appends.
        let max = self.messenger.capabilities().max_message_len.saturating_sub(3);
        truncate_text(text, max)
    }
}

fn retrieval_failed_reply(name: &str, err: &Error) -> String {
    let cause = match err {
        Error::RetrievalFailed(cause) => cause.clone(),
        other => other.to_string(),
    };
    format!(
        "❌ Failed to download {name}: {}",
        truncate_text(&cause, MAX_CAUSE_LEN)
    )
}

fn outcome_reply(name: &str, outcome: &PrintOutcome) -> String {
    match outcome {
        PrintOutcome::Success { details } if details.is_empty() => {
            format!("✅ File '{name}' was sent to the printer!")
        }
        PrintOutcome::Success { details } => format!(
            "✅ File '{name}' was sent to the printer!\n{}",
            truncate_text(details, MAX_DETAILS_LEN)
        ),
        PrintOutcome::CommandFailure { diagnostic } => format!(
            "❌ Print error: {}",
            truncate_text(diagnostic, MAX_DIAGNOSTIC_LEN)
        ),
        PrintOutcome::UnexpectedFailure { .. } => UNEXPECTED_FAILURE_REPLY.to_string(),
    }
}
