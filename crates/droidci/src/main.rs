use anyhow::Result;
use clap::Parser;
use droidci::logging::{self, LoggingConfig};

mod app;
mod cli;

fn main() -> Result<()> {
    let cli = crate::cli::Cli::parse();
    logging::init(&LoggingConfig::from_verbosity(
        cli.opts.verbose,
        cli.opts.log_json,
    ));
    crate::app::run(cli)
}
