use std::path::PathBuf;

use clap::Parser;

mod cli;
mod config;
mod error;
mod orchestrator;
mod player;
mod queue;
mod resolver;
mod runtime;
mod session;
mod track;

#[cfg(test)]
mod testing;

/// Queue YouTube audio from the terminal and play it track by track.
#[derive(Debug, Parser)]
#[command(name = "ytq", version, about)]
pub struct Args {
    /// Config file to use instead of `$YTQ_CONFIG_PATH` or the XDG default.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for downloaded audio (overrides `cache.dir`).
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Print the effective settings as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

fn main() -> anyhow::Result<()> {
    runtime::run(Args::parse())
}
