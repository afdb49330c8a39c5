//! `flipmeet` server binary.

use anyhow::Context;
use flipmeet_api::{App, AppConfig};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "flipmeet=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = App::build(&config).context("failed to assemble application")?;
    app.run().await.context("server stopped with an error")?;
    Ok(())
}
