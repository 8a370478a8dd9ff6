//! Telegram update handlers.
//!
//! Each incoming message is mapped onto the core update model and handed to
//! the print service. All pipeline logic lives in `printbot-core`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use printbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{is_start_command, CommandMessage, IncomingUpdate, OtherMessage},
};

use crate::router::AppState;

mod document;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let update = to_incoming(&msg);
    state.service.handle(update).await;
    Ok(())
}

/// Classify a Telegram message as start command, document, or anything else.
pub fn to_incoming(msg: &Message) -> IncomingUpdate {
    let message = MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    };
    let username = msg.from().and_then(|u| u.username.clone());

    if let Some(doc) = msg.document() {
        return IncomingUpdate::Document(document::to_document_message(message, username, doc));
    }

    if msg.text().is_some_and(is_start_command) {
        return IncomingUpdate::Start(CommandMessage { message, username });
    }

    IncomingUpdate::Other(OtherMessage { message, username })
}
