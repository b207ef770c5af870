//! trak - Task tracking CLI
//!
//! A standalone CLI that keeps a project's tasks in line-record files so
//! many coding agents can create, query, complete and relate work items
//! without trampling each other.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trak::cli::Cli;
use trak::output::{emit_error, infer_command_name_from_args};

/// RUST_LOG wins when it parses; oversized or malformed values are ignored
/// so a broken environment cannot take the CLI down with it. Without it,
/// `--verbose` raises the default from off to debug.
fn tracing_filter(verbose: bool) -> EnvFilter {
    if let Ok(raw) = std::env::var("RUST_LOG") {
        let raw = raw.trim();
        if !raw.is_empty() && raw.len() <= 4096 {
            if let Ok(filter) = EnvFilter::try_new(raw) {
                return filter;
            }
        }
    }

    if verbose {
        EnvFilter::new("trak=debug")
    } else {
        EnvFilter::new("off")
    }
}

fn main() {
    // Peeked from raw argv so the subscriber exists before clap runs
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");

    // Log to stderr so --json output on stdout stays parseable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(tracing_filter(verbose))
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
