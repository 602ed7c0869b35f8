pub mod config;
pub mod parse;
pub mod run;
pub mod store;

use clap::{Parser, Subcommand};

/// bulletin-watch: mail new portal bulletin posts that match your keywords.
#[derive(Debug, Parser)]
#[command(name = "bulletin-watch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, check the board and notify (default when no subcommand is given).
    Run {
        /// Print the notification instead of mailing it and leave the store untouched.
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse a saved listing page and print `identity : title` lines.
    Parse {
        /// Path to an HTML file.
        file: String,
    },
    /// Inspect the identity store.
    #[command(subcommand)]
    Store(StoreCommand),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Print every seen identity.
    List,
    /// Print the number of seen identities.
    Count,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BW_CONFIG";

/// Load the configuration from the path in `BW_CONFIG` (or `config.toml`),
/// then apply the `BW_RECIPIENT` / `BW_KEYWORDS` overrides.  A missing file
/// yields the defaults.  Returns the config and the path that was used.
pub fn load_config() -> anyhow::Result<(bw_domain::config::Config, String)> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());
    let mut config = load_config_from(&config_path)?;
    config.apply_env_overrides();
    Ok((config, config_path))
}

/// Read and parse `path` without applying environment overrides.
pub fn load_config_from(path: &str) -> anyhow::Result<bw_domain::config::Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(bw_domain::config::Config::default());
    }
    let raw =
        std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
