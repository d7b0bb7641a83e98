//! `trafficlink` binary.

use std::{
    io::{self, Write},
    process::ExitCode,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use trafficlink_cli::{Cli, execute, render::render};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rendered = execute(&cli).and_then(|report| Ok((render(&report, cli.json)?, report.exit_code())));
    match rendered {
        Ok((text, code)) => {
            let mut stdout = io::stdout().lock();
            if write!(stdout, "{text}").and_then(|()| writeln_if_json(&mut stdout, cli.json)).is_err() {
                return ExitCode::FAILURE;
            }
            code
        },
        Err(err) => {
            let _ = writeln!(io::stderr(), "error: {err}");
            ExitCode::from(2)
        },
    }
}

fn writeln_if_json(out: &mut impl Write, json: bool) -> io::Result<()> {
    if json { writeln!(out) } else { Ok(()) }
}

/// Logs go to stderr; `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}
