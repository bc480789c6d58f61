//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// Arguments of the `kai` executable
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kai", version, about = "Run Kai programs")]
pub struct Cli {
    /// Program file to run
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Inline program to evaluate
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    pub eval: Option<String>,

    /// JSON runtime configuration
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra directory searched for native modules (repeatable)
    #[arg(short = 'm', long = "module-path", value_name = "DIR")]
    pub module_path: Vec<PathBuf>,

    /// Interpret everything, never compile
    #[arg(long)]
    pub no_jit: bool,

    /// Print the parsed program before running it
    #[arg(long)]
    pub print_ast: bool,

    /// Print collector statistics on exit
    #[arg(long)]
    pub gc_stats: bool,
}

impl Cli {
    /// Whether there is anything to run
    pub fn has_input(&self) -> bool {
        self.file.is_some() || self.eval.is_some()
    }
}
