mod backend;
mod changelog;
mod cli;
mod config;
mod error;
mod history;
mod output;
mod pipeline;
mod structure;

use clap::{CommandFactory, Parser};
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting repodoc");

    if let Err(err) = cli.execute().await {
        eprintln!("{} {err:#}\n", output::failure("Error:"));
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    }
}
