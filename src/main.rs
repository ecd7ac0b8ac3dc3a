use std::sync::Arc;

use mazeshooter::server;
use mazeshooter::state::room_store::MemoryRoomStore;
use mazeshooter::utils::config::{Config, CONFIG_ENV};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load immutable config before logging so the level can come from it
    let config = Arc::new(Config::load());
    setup_logging(&config)?;

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        log::info!("Config source: {}", path);
    }

    // Rooms live in-process
    let store = Arc::new(MemoryRoomStore::new());

    server::start_http_server(store, config).await?;

    Ok(())
}

fn setup_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Utc::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(config.log_level_filter())
        .chain(std::io::stdout())
        .chain(fern::log_file("mazeshooter.log")?)
        .apply()?;
    Ok(())
}
