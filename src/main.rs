use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use rouilleudpd::core_cli::ServerCli;
use rouilleudpd::helpers::{init_logger, load_config, log_config};
use rouilleudpd::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = ServerCli::parse();
    init_logger(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    if config.server.root_dir.is_none() {
        bail!("No root directory given: pass it as an argument or set server.root_dir");
    }

    info!("Starting rouilleudpd");
    log_config(&config);

    server::run(config).await
}
