// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual-exercise entry point: spawn a child under a pseudo-TTY, compose
//! the example connection lifecycle (`scry::examples_builtin`), and run
//! the HSM engine until it finishes or faults.
//!
//! Process-level flags (`--cols`, `--rows`, `--term`, `--log-level`) are
//! parsed with `clap`; repeatable `--set SECTION.OPTION=VALUE` arguments
//! feed `ConfigTree::update_from_argument_list` for deeper per-screen
//! configuration the flags don't cover.

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use scry::config::ConfigTree;
use scry::engine::Automaton;
use scry::examples_builtin::base_connection_unit;
use scry::terminal::PtyTerminal;

/// Run the screen-scraping HSM engine against a spawned child process.
#[derive(Debug, Parser)]
#[command(name = "scry-demo", version, about)]
struct Cli {
    /// Terminal columns.
    #[arg(long, default_value = "80")]
    cols: u16,

    /// Terminal rows.
    #[arg(long, default_value = "24")]
    rows: u16,

    /// TERM environment variable exported to the child (`General.term`).
    #[arg(long, default_value = "ANSI")]
    term: String,

    /// Log level passed to `tracing_subscriber`'s env-filter.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Additional `[SECTION[.SUBSECTION…].]OPTION=VALUE` config entries,
    /// repeatable.
    #[arg(long = "set", value_name = "OPTION=VALUE")]
    config: Vec<String>,

    /// Command to run under the pseudo-TTY (after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = ConfigTree::new();
    config.set(Some("General"), "term", &cli.term);
    if let Err(e) = config.update_from_argument_list(&cli.config) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    let terminal = match PtyTerminal::spawn(&cli.command, cli.cols, cli.rows, &cli.term) {
        Ok(terminal) => terminal,
        Err(e) => {
            error!(error = %e, "failed to spawn child process");
            std::process::exit(1);
        }
    };

    let mut automaton = Automaton::new(vec![base_connection_unit()], Box::new(terminal), config);
    if let Err(e) = automaton.compose(Vec::new()) {
        error!(error = %e, "failed to compose base behavior chain");
        std::process::exit(1);
    }

    match automaton.run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!(error = %e, state = %automaton.state(), "state machine faulted");
            std::process::exit(1);
        }
    }
}
