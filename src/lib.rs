pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;
pub mod stream;

use cli::Args;
use config::RelayConfig;
use log::info;
use relay::Relay;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", config.server_addr);
    info!("Chat Base URL: {}", config.llm.base_url);
    info!("Chat Model: {}", config.llm.model);
    info!("Temperature: {}", config.llm.temperature);
    info!("Generation Timeout Hint: {} ms", config.llm.timeout_ms);
    match config.llm.request_timeout {
        Some(deadline) => info!("Upstream Deadline: {}s", deadline.as_secs()),
        None => info!("Upstream Deadline: none"),
    }
    info!("System Prompt: {} chars", config.system_prompt.chars().count());
    info!("Static Dir: {:?}", config.static_dir);
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("-------------------------");

    let relay = Relay::from_config(&config)?;
    let server = Server::new(config, relay);
    server.run().await?;

    Ok(())
}
