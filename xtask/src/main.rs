// Licensed under the Apache-2.0 license

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process::ExitCode;

mod devtypes_gen;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Code generation tasks for device type catalogs", long_about = None)]
struct Cli {
    /// Log more; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate device type tables, poll decoders and scripting bindings
    DevtypesGen(devtypes_gen::DevtypesArgs),

    /// Fail if generated device type sources are missing or out of date
    DevtypesCheck(devtypes_gen::DevtypesArgs),
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new()
        .without_timestamps()
        .with_level(cli.log_level())
        .init()
    {
        eprintln!("Logger setup failed: {e}");
    }

    let result = match &cli.command {
        Commands::DevtypesGen(args) => devtypes_gen::generate(args),
        Commands::DevtypesCheck(args) => devtypes_gen::check(args),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
