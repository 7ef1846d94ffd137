use anyhow::Result;
use clap::Parser;
use stock_screener::cli::{Cli, Command};
use stock_screener::{logging, show, visibility, watch};

#[tokio::main]
async fn main() -> Result<()> {
    let (global, command) = Cli::parse().into_parts();
    logging::init(&global.log_level);

    match command {
        Command::Show(args) => show::run(&global, args).await,
        Command::Watch(args) => watch::run(&global, args).await,
        Command::Columns(command) => visibility::run(&global, command),
    }
}
