use clap::Parser;
use env_logger::Env;

use ariactl::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let code = cli::run(cli).await;
    std::process::exit(code);
}
