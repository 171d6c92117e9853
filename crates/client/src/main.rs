use clap::Parser;

use storefront_client::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init_cli();
    cli::run(Cli::parse()).await
}
