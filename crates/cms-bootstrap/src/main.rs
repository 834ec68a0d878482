//! Inspect the bootstrap configuration a site resolves to.

use clap::Parser;
use cms_bootstrap::cli::{self, Cli};
use std::io;

fn main() -> anyhow::Result<()> {
    cms_bootstrap::init_logging();
    let cli = Cli::parse();
    let stdout = io::stdout();
    cli::run(&cli, &mut stdout.lock())
}
