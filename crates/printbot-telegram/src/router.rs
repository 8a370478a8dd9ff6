use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use printbot_core::{
    config::Config,
    messaging::port::{FilePort, MessagingPort},
    print::PrintDispatcher,
    retriever::AttachmentRetriever,
    service::PrintService,
    storage::TransientStorage,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub service: PrintService,
}

/// Long-poll Telegram and feed every message into a [`PrintService`].
///
/// `storage` must already be ready; `dispatcher` wraps the print capability.
pub async fn run_polling(
    cfg: Arc<Config>,
    storage: TransientStorage,
    dispatcher: PrintDispatcher,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "printbot started"),
        Err(e) => warn!(error = %e, "could not fetch bot identity"),
    }
    info!(
        download_dir = %storage.root().display(),
        print_command = %cfg.print_command,
        "configuration"
    );

    // Skip whatever piled up while the bot was offline.
    bot.delete_webhook().drop_pending_updates(true).await?;

    let telegram = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = telegram.clone();
    let files: Arc<dyn FilePort> = telegram;

    let retriever = AttachmentRetriever::new(storage, files, cfg.max_file_size);
    let state = Arc::new(AppState {
        service: PrintService::new(messenger, retriever, dispatcher),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        // No per-chat ordering: every message is handled on its own task.
        .distribution_function(|_| None::<std::convert::Infallible>)
        .build()
        .dispatch()
        .await;

    Ok(())
}
