//! Mica IL workbench command-line interface
//!
//! Front-end over the parser, interpreter, and pass manager: check a
//! program, run it against stdin, push it through an optimization
//! pipeline, or list the registered passes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// The Mica IL workbench
#[derive(Parser)]
#[command(name = "mica")]
#[command(about = "Parse, interpret, and transform Mica IL programs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a program and validate its CFG
    Check {
        /// IL source file
        file: PathBuf,
    },

    /// Interpret a program
    Run {
        /// IL source file
        file: PathBuf,

        /// Read program input from a file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Emit a trace record per executed instruction to stderr
        #[arg(long)]
        trace: bool,

        /// Honor brkpt instructions (snapshots print to stderr)
        #[arg(long = "break")]
        breakpoints: bool,
    },

    /// Run a pass pipeline and print the transformed program
    Opt {
        /// IL source file
        file: PathBuf,

        /// Pipeline, e.g. "stats, cfold(2), dce, simplify"
        #[arg(short, long)]
        pipeline: String,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered passes with their signatures
    Passes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    match cli.command {
        Commands::Check { file } => commands::check::execute(file),
        Commands::Run {
            file,
            input,
            trace,
            breakpoints,
        } => commands::run::execute(file, input, trace, breakpoints),
        Commands::Opt {
            file,
            pipeline,
            output,
        } => commands::opt::execute(file, pipeline, output),
        Commands::Passes => commands::passes::execute(),
    }
}
