//! `paperctl`: sets a hyprpaper wallpaper from the command line.
//!
//! ```text
//! paperctl wallpaper "DP-1,~/pictures/forest.png,cover"
//! paperctl --no-discovery wallpaper ",~/pictures/forest.png,"
//! ```
//!
//! The command words are joined into the `"/hyprpaper wallpaper ..."` form
//! and handed to the [`Dispatcher`].  Exit status is zero on success; on
//! failure the error message is printed and the status is non-zero.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use paper_client::application::request::COMMAND_PREFIX;
use paper_client::infrastructure::config::ClientConfig;
use paper_client::infrastructure::environment::ProcessEnvironment;
use paper_client::infrastructure::transport::UnixConnector;
use paper_client::Dispatcher;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Send a wallpaper request to hyprpaper.
#[derive(Debug, Parser)]
#[command(name = "paperctl", version)]
struct Cli {
    /// Config file to use instead of `$XDG_CONFIG_HOME/paperctl/config.toml`.
    #[arg(long, env = "PAPERCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the discovery broker and use the well-known socket directly.
    #[arg(long)]
    no_discovery: bool,

    /// The command, e.g. `wallpaper DP-1,~/pic.png,tile`.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    command: Vec<String>,
}

impl Cli {
    /// The raw command string the dispatcher expects.
    fn raw_command(&self) -> String {
        let joined = self.command.join(" ");
        if joined.starts_with(COMMAND_PREFIX) {
            joined
        } else {
            format!("{COMMAND_PREFIX} {joined}")
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env = ProcessEnvironment;

    let mut config = ClientConfig::load(cli.config.as_deref(), &env).context("loading configuration")?;
    if cli.no_discovery {
        config.discovery.enabled = false;
    }

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let raw = cli.raw_command();
    debug!("dispatching {raw:?}");

    Dispatcher::new(UnixConnector, env, config).make_request(&raw)?;
    println!("ok");
    Ok(())
}
