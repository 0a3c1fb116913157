//! ripple CLI - call graph impact analysis for code review
//!
//! Usage: ripple --ast <FILE> [arguments]

mod analyze_cmd;
mod cli;

use std::process::ExitCode;

use cli::{parse_args, print_usage, Command};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the summary only
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let command = match parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            print_usage();
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("{}", ripple::version::version());
            ExitCode::SUCCESS
        }
        Command::Analyze(args) => {
            init_tracing(args.verbose);
            if let Err(e) = analyze_cmd::run_analyze(&args) {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
    }
}
