// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Warden - encrypted local keystore for server secrets.
//!
//! This is the binary entry point: keystore administration under
//! `warden keystore`, and the startup path under `warden start`.

mod keystore_cmd;
mod start;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use warden_config::WardenConfig;
use warden_core::{exit_code, StartupMode, Terminal, WardenError};
use warden_keystore::ConsoleTerminal;

use crate::keystore_cmd::KeystoreCommand;

/// Warden - encrypted local keystore for server secrets.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding `warden.keystore` (overrides `keystore.config_dir`).
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the keystore.
    Keystore {
        #[command(subcommand)]
        command: KeystoreCommand,
    },
    /// Open the keystore as a starting server would.
    Start {
        /// Started by a service manager: no terminal or stdin. A protected
        /// keystore needs WARDEN_KEYSTORE_PASSPHRASE_FILE exported to the
        /// process environment.
        #[arg(long)]
        service_managed: bool,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout with status 0.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(exit_code::USAGE);
        }
    };

    let mut config = match load_config(&cli) {
        Ok(config) => config,
        Err(errors) => {
            warden_config::render_errors(&errors);
            std::process::exit(warden_config::into_warden_error(&errors).exit_code());
        }
    };
    if let Some(dir) = &cli.config_dir {
        config.keystore.config_dir = dir.display().to_string();
    }

    init_tracing(&config.log.level);

    let mut terminal = ConsoleTerminal::new();
    if let Err(e) = run(cli.command, &config, &mut terminal) {
        tracing::debug!(error = ?e, "command failed");
        terminal.eprintln(&format!("ERROR: {e}"));
        std::process::exit(e.exit_code());
    }
}

fn load_config(cli: &Cli) -> Result<WardenConfig, Vec<warden_config::ConfigError>> {
    match &cli.config {
        Some(path) => warden_config::load_and_validate_path(path),
        None => warden_config::load_and_validate(),
    }
}

fn run(
    command: Commands,
    config: &WardenConfig,
    terminal: &mut dyn Terminal,
) -> Result<(), WardenError> {
    match command {
        Commands::Keystore { command } => keystore_cmd::run(command, &config.keystore, terminal),
        Commands::Start { service_managed } => {
            let mode = if service_managed {
                StartupMode::ServiceManaged
            } else {
                StartupMode::Interactive
            };
            start::run_start(&config.keystore, mode, terminal).map(|_| ())
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so stdout stays clean for `warden keystore list`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warden={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_keystore_subcommands() {
        let cli = Cli::try_parse_from(["warden", "keystore", "add", "db.password", "--stdin", "-f"])
            .unwrap();
        match cli.command {
            Commands::Keystore { command } => assert_eq!(
                command,
                KeystoreCommand::Add {
                    name: "db.password".into(),
                    stdin: true,
                    force: true,
                }
            ),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["warden", "keystore", "has-passwd", "--config-dir", "/tmp/w"])
            .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/w")));
        assert!(matches!(
            cli.command,
            Commands::Keystore {
                command: KeystoreCommand::HasPasswd
            }
        ));
    }

    #[test]
    fn parses_start_flags() {
        let cli = Cli::try_parse_from(["warden", "start", "--service-managed"]).unwrap();
        assert!(matches!(cli.command, Commands::Start { service_managed: true }));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["warden"]).is_err());
        assert!(Cli::try_parse_from(["warden", "keystore", "add"]).is_err());
    }
}
