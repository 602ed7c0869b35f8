use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use bw_domain::config::LoggingConfig;
use bw_watcher::cli::{Cli, Command, ConfigCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to a live run when no subcommand is given.
        None => {
            let (config, _) = bw_watcher::cli::load_config()?;
            init_tracing(&config.logging);
            bw_watcher::cli::run::run(&config, false).await
        }
        Some(Command::Run { dry_run }) => {
            let (config, _) = bw_watcher::cli::load_config()?;
            init_tracing(&config.logging);
            bw_watcher::cli::run::run(&config, dry_run).await
        }
        Some(Command::Parse { file }) => {
            init_cli_tracing();
            bw_watcher::cli::parse::parse_file(&file)
        }
        Some(Command::Store(command)) => {
            init_cli_tracing();
            let (config, _) = bw_watcher::cli::load_config()?;
            bw_watcher::cli::store::run(&config, command)
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = bw_watcher::cli::load_config()?;
            if !bw_watcher::cli::config::validate(&config, &config_path)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = bw_watcher::cli::load_config()?;
            bw_watcher::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("bulletin-watch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Subscriber for watch runs: `RUST_LOG` wins, then `[logging] filter`.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Quiet stderr logging for the inspection subcommands.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
