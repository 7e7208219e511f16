use std::sync::Arc;

use {
    anyhow::Context,
    clap::Parser,
    teledrop_config::Settings,
    teledrop_storage::SafeStorage,
    teledrop_telegram::{Router, TelegramTransport, build_bot, start_polling},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "teledrop", about = "Teledrop — Telegram file download bot", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true).with_thread_ids(false)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(false).with_ansi(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "teledrop starting");

    let settings = Settings::from_env().context("invalid configuration")?;
    let storage = SafeStorage::new(settings.storage.clone())
        .context("could not prepare the upload directory")?;
    let bot = build_bot(&settings.telegram).context("could not build the Telegram client")?;
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let router = Router::new(transport, settings.fetch.into(), storage);

    let token =
        start_polling(bot, router).await.context("could not connect to Telegram")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            token.cancel();
        },
        () = token.cancelled() => {
            warn!("polling stopped, shutting down");
        },
    }
    info!("teledrop stopped");
    Ok(())
}
