use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rouilleudpd::core_cli::ClientCli;
use rouilleudpd::core_client::{ClientError, FileClient};
use rouilleudpd::helpers::{init_logger, load_config};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ClientCli::parse();
    init_logger(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let mut client = match FileClient::connect(&config).await {
        Ok(client) => client,
        Err(e @ ClientError::ConnectFailed { .. }) => {
            eprintln!("{}", "Too many connection attempts, giving up.".red());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let greeting = client.greeting().await.context("No greeting from server")?;
    println!("{}", greeting);

    client
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("Session ended with an error")?;

    Ok(())
}
