mod config;
mod game;
mod simulation;
mod snake;
mod store;
mod term;
mod theme;

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    info!(?cli, "starting gridsnake");

    let mut game = game::SnakeGame::new(cli)?;
    // The game loop restores the terminal itself, also when it fails
    game.run()
}

/// Logs go to a file; stdout belongs to the game.
fn init_tracing(cli: &Cli) -> Result<()> {
    let file = File::create(&cli.log_file)
        .with_context(|| format!("failed to create log file {}", cli.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
