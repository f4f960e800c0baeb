mod config;
mod dispatch;
mod health;
mod llm;
mod platform;
mod responder;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatch::MessageDispatcher;
use crate::llm::LlmClient;
use crate::responder::Responder;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a missing bot token stops us here
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    let settings = config.llm.completion_settings();
    info!("Configuration loaded successfully");
    info!("  Persona: {}", settings.persona);
    info!("  Model: {}", settings.model);
    info!("  Completion timeout: {:?}", settings.timeout);
    info!("  Health port: {}", config.health.port);

    let backend = Arc::new(LlmClient::new(config.llm.base_url.as_str()));
    let responder = Responder::new(settings, config.llm.api_key.clone(), backend);
    if responder.is_degraded() {
        warn!("No completion API key configured; every message will get the fallback reply");
    }
    let dispatcher = Arc::new(MessageDispatcher::new(responder));

    let bot = Bot::new(&config.telegram.bot_token);

    // Two independent tasks: long polling and the liveness endpoint
    let mut bot_task = tokio::spawn(platform::telegram::run(bot, dispatcher));
    let mut health_task = tokio::spawn(health::serve(config.health.port));

    info!("Bot is starting...");

    tokio::select! {
        res = &mut bot_task => match res {
            Ok(Ok(())) => info!("Telegram polling stopped"),
            Ok(Err(e)) => return Err(e.context("Telegram polling failed")),
            Err(e) => error!("Telegram task panicked: {}", e),
        },
        res = &mut health_task => match res {
            Ok(Ok(())) => info!("Health endpoint stopped"),
            Ok(Err(e)) => return Err(e.context("Health endpoint failed")),
            Err(e) => error!("Health task panicked: {}", e),
        },
    }

    Ok(())
}
