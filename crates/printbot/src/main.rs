use std::sync::Arc;

use tracing::info;

use printbot_core::{config::Config, print::PrintDispatcher, storage::TransientStorage};
use printbot_lp::LpPrinter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    printbot_core::logging::init("printbot")?;

    let cfg = Arc::new(Config::load()?);

    // The bot cannot accept documents without somewhere to put them.
    let storage = TransientStorage::new(cfg.download_dir.clone());
    storage.ensure_ready()?;
    storage.sweep_stale();

    let printer = LpPrinter::new(cfg.print_command.clone(), cfg.print_args());
    info!(
        program = %printer.program(),
        timeout_ms = cfg.print_timeout.as_millis() as u64,
        "print capability configured"
    );
    let dispatcher = PrintDispatcher::new(Arc::new(printer), cfg.print_timeout);

    printbot_telegram::router::run_polling(cfg, storage, dispatcher).await
}
