//! Telegram adapter (teloxide).
//!
//! Implements the `printbot-core` messaging and file ports over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{net::Download, prelude::*};
use tokio::{io::AsyncWrite, time::sleep};

pub mod handlers;
pub mod router;

use printbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::{FilePort, MessagingPort},
        types::{MessagingCapabilities, RemoteFile},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    async fn with_retry<T, Fut>(
        &self,
        map_err: fn(teloxide::RequestError) -> Error,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(map_err(other)),
                },
            }
        }
    }
}

fn send_err(e: teloxide::RequestError) -> Error {
    Error::SendFailed(format!("telegram error: {e}"))
}

fn file_err(e: teloxide::RequestError) -> Error {
    Error::External(format!("telegram error: {e}"))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_replies: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(send_err, || {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(send_err, || {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), text.to_string())
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
            })
            .await?;

        Ok(MessageRef {
            chat_id: to.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[async_trait]
impl FilePort for TelegramMessenger {
    async fn resolve(&self, file_id: &str) -> Result<RemoteFile> {
        let file = self
            .with_retry(file_err, || self.bot.get_file(file_id.to_string()))
            .await?;

        Ok(RemoteFile {
            file_id: file_id.to_string(),
            path: file.path.clone(),
            size: Some(u64::from(file.size)),
        })
    }

    async fn download(
        &self,
        file: &RemoteFile,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        self.bot
            .download_file(&file.path, dst)
            .await
            .map_err(|e| Error::External(format!("telegram download error: {e}")))
    }
}
