// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recepta - an always-on messaging bot core.
//!
//! This is the binary entry point for the Recepta agent.

use clap::{Parser, Subcommand};

/// Recepta - an always-on messaging bot core.
#[derive(Parser, Debug)]
#[command(name = "recepta", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Recepta agent server.
    Serve,
    /// Show the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match recepta_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            recepta_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    match cli.command {
        Some(Commands::Serve) => {
            // The transport adapter and reply generator are supplied by the
            // embedding application through recepta::serve::run; this binary
            // ships none.
            eprintln!(
                "recepta serve: no transport adapter is compiled into this binary; \
                 embed recepta::serve::run with a transport implementation"
            );
            std::process::exit(1);
        }
        Some(Commands::Config) => match toml_summary(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("recepta config: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("recepta: use --help for available commands");
        }
    }
}

fn toml_summary(config: &recepta_config::model::ReceptaConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recepta={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config =
            recepta_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.agent.name, "recepta");
        assert_eq!(config.transport.max_reconnect_attempts, 5);
    }
}
