use std::{process::ExitCode, sync::Arc};

use mcp_sse_template::{
    config::Config,
    domain::{self, rules::RuleStore},
    logging,
    registry::Registry,
    server::{shutdown_signal, McpServer},
    ServerInfo,
};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let store = Arc::new(RuleStore::open(config.rules_path.clone()).await);
    let mut registry = Registry::new();
    domain::register_all(&mut registry, &ServerInfo::from(&config), store);

    let server = McpServer::new(&config, registry);
    server.run_until(shutdown_signal()).await?;
    Ok(())
}
