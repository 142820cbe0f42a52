mod commands;

use clap::{Parser, Subcommand};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mason",
    version,
    about = "Declarative build configuration for C and C++ projects"
)]
pub struct Cli {
    /// Build directory, seeded as `builddir`
    #[arg(long, global = true, default_value = "build")]
    pub builddir: String,

    /// Build type, seeded as `buildtype` (debug, release, minsize, relwithdebinfo)
    #[arg(long, global = true, default_value = "debug")]
    pub buildtype: String,

    /// Install prefix, seeded as `prefix`
    #[arg(long, global = true, default_value = "/usr/local")]
    pub prefix: String,

    /// Show debug output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate the build file and write backend build files
    Setup {
        /// Source directory containing mason.build
        #[arg(default_value = ".")]
        source_dir: PathBuf,

        /// Backend to generate: ninja or make
        #[arg(long, default_value = "ninja")]
        backend: String,
    },
    /// Export the target dependency graph
    Graph {
        /// Source directory containing mason.build
        #[arg(default_value = ".")]
        source_dir: PathBuf,

        /// Output format: dot or json
        #[arg(long, default_value = "dot")]
        format: String,
    },
    /// List the tasks declared in the build file
    Tasks {
        /// Source directory containing mason.build
        #[arg(default_value = ".")]
        source_dir: PathBuf,
    },
    /// Run a named task
    Task {
        /// Task name as declared in the build file
        name: String,

        /// Source directory containing mason.build
        #[arg(default_value = ".")]
        source_dir: PathBuf,
    },
    /// Print the evaluated build configuration
    Info {
        /// Source directory containing mason.build
        #[arg(default_value = ".")]
        source_dir: PathBuf,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = SimpleLogger::init(filter, LogConfig::default());
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    std::process::exit(commands::dispatch(&cli));
}
