//! Kai runtime CLI
//!
//! Entry point for the `kai` executable. Parses arguments and delegates to a
//! [`Session`] for execution.

use clap::Parser as ClapParser;
use kai_cli::{logging, Cli, CliResult, Session};

fn run(cli: &Cli) -> CliResult<()> {
    let mut session = Session::from_cli(cli)?;

    let result = match (&cli.file, &cli.eval) {
        (Some(path), _) => session.execute_file(path),
        (None, Some(code)) => session.execute_string(code),
        (None, None) => return Ok(()),
    };

    // Report statistics even when the program failed.
    if session.wants_gc_stats() {
        eprintln!("{}", session.gc_report());
    }

    if let Some(text) = session.render(result?) {
        println!("{}", text);
    }
    Ok(())
}

fn print_usage() {
    println!("Kai runtime v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  kai --file <FILE>     Run a Kai program");
    println!("  kai --eval <CODE>     Evaluate inline Kai code");
    println!();
    println!("Run 'kai --help' for more options.");
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    if !cli.has_input() {
        print_usage();
        return;
    }

    if let Err(error) = run(&cli) {
        eprintln!("Error: {}", error);
        std::process::exit(error.exit_code());
    }
}
