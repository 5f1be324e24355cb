// Entrypoint for the CLI application.
// - Sets up logging, loads the config file and builds the API client.
// - Hands the client to the interactive menu.

use anyhow::Context;
use labor_cli::{api::ApiClient, config::ConfigStore, session::Session, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // LABOR_LOG, then RUST_LOG; quiet by default so prompts stay readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LABOR_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = ConfigStore::open_default().context("Failed to load config")?;
    let api = ApiClient::from_env(Session::new(store)).context("Failed to build HTTP client")?;

    // Blocks until the user picks "Exit".
    main_menu(&api)?;
    Ok(())
}
