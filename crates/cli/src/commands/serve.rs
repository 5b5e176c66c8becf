//! `parley serve` — Start the HTTP gateway.

use parley_config::AppConfig;

pub async fn run(mut config: AppConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.gateway.port = port;
    }
    parley_gateway::start(config).await
}
