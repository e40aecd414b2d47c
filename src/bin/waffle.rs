//! Compiles the project described by a config file.
//!
//! ```text
//! waffle [config.json]
//! ```
//!
//! Exits with 0 when the build succeeded and with 1 when the compiler reported errors or the
//! build could not run.

use std::process::exit;
use tracing_subscriber::EnvFilter;
use waffle::compiler::{error::Result, CompileStatus, Config, Project};

async fn run(config_path: Option<String>) -> Result<CompileStatus> {
    let config = Config::load_or_default(config_path)?;
    tracing::debug!(?config, "loaded config");
    Project::from_config(config)?.compile().await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config_path = std::env::args().nth(1);
    match run(config_path).await {
        Ok(status) => exit(status.exit_code()),
        Err(err) => {
            tracing::error!(%err, "build failed");
            eprintln!("{err}");
            exit(1)
        }
    }
}
