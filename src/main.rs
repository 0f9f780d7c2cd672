// Taskmate - command line entry point
//
// Reads one inbound request as JSON from stdin and prints the response JSON.

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use taskmate::storage::ConfigService;
use taskmate::{AppState, InboundRequest};
use taskmate_llm::OpenAIProvider;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigService::new().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.get_config().log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database = taskmate::storage::Database::open(&config.database_path()?)
        .context("failed to open database")?;
    let provider = Arc::new(OpenAIProvider::new().context("failed to build HTTP client")?);

    let state = AppState::new(tracing::info_span!("taskmate"));
    state.initialize(config, database, provider).await?;
    if !state.is_healthy().await {
        anyhow::bail!("database or configuration is not usable");
    }

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;
    let request: InboundRequest =
        serde_json::from_str(&input).context("request is not valid JSON")?;

    let response = state.handle(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
