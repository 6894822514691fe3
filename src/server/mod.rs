pub mod api;

use crate::config::RelayConfig;
use crate::relay::Relay;
use std::error::Error;

pub struct Server {
    config: RelayConfig,
    relay: Relay,
}

impl Server {
    pub fn new(config: RelayConfig, relay: Relay) -> Self {
        Self { config, relay }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.config, self.relay.clone()).await
    }
}
