// main.rs
mod audio;
mod auth;
mod cli;
mod config;
mod model;
mod provider;
mod session;
mod sheet;
mod shell;
mod store;

use clap::Parser;

use cli::{Args, Commands};

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::handle_shell(args.data_dir).await,
        Commands::Status => cli::handle_status(args.data_dir).await,
        Commands::History => cli::handle_history(args.data_dir).await,
        Commands::Archive => cli::handle_archive(args.data_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
