mod anki;
mod cache;
mod cli;
mod client;
mod config;
mod deck;
mod error;
mod extract;
mod freq;
mod logging;
mod media;
mod merge;
mod refresh;
mod utils;
mod words;

use crate::anki::{AnkiConnectClient, AnkiSink};
use crate::cli::{Cli, Command};
use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::logging::{init_logging, parse_log_level, LoggerConfig};
use crate::words::BuildOptions;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let level = cli.log_level().unwrap_or(config.logging.level.as_str());
    let directory = Some(config.logging.directory.clone()).filter(|dir| !dir.is_empty());
    let logger_config = LoggerConfig {
        directory,
        file_name: config.logging.filename.clone(),
        rotation: tracing_appender::rolling::Rotation::DAILY,
        level: parse_log_level(level)?,
    };
    init_logging(logger_config)?;

    match run(&cli, &config).await {
        Ok(()) => Ok(()),
        Err(err) => {
            log_error!(&err => "[main] run aborted");
            Err(err)
        }
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let connect_url = cli
        .connect_url
        .clone()
        .unwrap_or_else(|| config.anki.connect_url.clone());
    let anki = AnkiConnectClient::new(connect_url);

    // The store must answer before any stage touches the collection.
    let version = anki.version().await?;
    log_info!("[main] AnkiConnect version {}", version);

    if let Some(profile) = &cli.profile {
        anki.load_profile(profile).await?;
        log_info!("[main] loaded profile {}", profile);
    }

    match &cli.command {
        Command::Reset { package } => reset(&anki, config, package.as_deref()).await,
        Command::Refresh { force, limit } => {
            let site = site_client(config, &config.sites.kanjidamage_url)?;
            refresh::run(&site, &anki, config, *force, *limit).await?;
            Ok(())
        }
        Command::Build {
            force,
            limit,
            dump,
            export,
        } => {
            let tangorin = site_client(config, &config.sites.tangorin_url)?;
            let mut sink = AnkiSink::new(anki.clone());
            let options = BuildOptions {
                force: *force,
                limit: *limit,
                dump: dump.clone(),
                export: export.clone(),
            };
            words::run(&tangorin, &anki, &mut sink, config, &options).await
        }
    }
}

/// Removes both bundled-deck variants and imports the package from scratch.
async fn reset(anki: &AnkiConnectClient, config: &Config, package: Option<&Path>) -> Result<()> {
    let decks = anki.deck_names().await?;
    let targets: Vec<&str> = [
        config.anki.deck.as_str(),
        config.anki.reordered_deck.as_str(),
    ]
    .into_iter()
    .filter(|name| decks.iter().any(|existing| existing == name))
    .collect();
    if !targets.is_empty() {
        anki.delete_decks(&targets).await?;
        log_info!("[main] removed decks: {}", targets.join(", "));
    }

    let package = package
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.anki.package));
    // The store resolves the path on its side of the socket, so it has to
    // be absolute.
    let absolute = std::fs::canonicalize(&package)?;
    anki.import_package(&absolute).await?;
    log_info!("[main] imported {}", package.display());
    Ok(())
}

fn site_client(config: &Config, base_url: &str) -> Result<Client> {
    Client::builder()
        .base_url(base_url)
        .header("user-agent", USER_AGENT)?
        .header("accept", "text/html,application/xhtml+xml")?
        .timeout(Duration::from_secs(config.sites.request_timeout))
        .build()
}
