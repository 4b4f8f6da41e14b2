mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Resources => commands::inspect::resources(&ctx),
        Command::Schema { type_name } => commands::inspect::schema(&ctx, type_name.as_deref()),
        Command::Config { file } => {
            let path = cli::config_file(file.as_deref())?;
            commands::config::run(&ctx, path.as_deref())
        }
        Command::Token(command) => {
            println!("{}", command.token());
            Ok(())
        }
    }
}
