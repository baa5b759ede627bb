//! bookkeeper command-line entry point.

use bookkeeper::{
    config::{Cli, Command, Config},
    formats::Bookkeeper,
    manifest,
    scan::Scanner,
};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookkeeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Scan { path, workers } => cmd_scan(&load_config(cli.config)?, &path, workers),
        Command::Extract { input, output } => {
            cmd_extract(&load_config(cli.config)?, &input, &output)
        }
        Command::Info { path } => cmd_info(&load_config(cli.config)?, &path),
    }
}

/// Find or load config.
fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = explicit.or_else(Config::find_config_file) else {
        return Ok(Config::default());
    };

    tracing::debug!(config = %path.display(), "Loading config");
    Ok(Config::load(&path)?)
}

/// Create a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("bookkeeper.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    Ok(())
}

/// Print one JSON line per book file under `path`.
fn cmd_scan(config: &Config, path: &Path, workers: Option<usize>) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let mut scanner = Scanner::new(&config.scan);
    if let Some(workers) = workers {
        scanner = scanner.with_workers(workers);
    }

    let stdout = io::stdout();
    scanner.scan_to(path, io::BufWriter::new(stdout.lock()))?;
    Ok(())
}

/// Extract pages and write the manifest.
fn cmd_extract(config: &Config, input: &Path, output: &Path) -> anyhow::Result<()> {
    let bookkeeper = Bookkeeper::new(&config.pdf);
    let extraction =
        manifest::extract_with_manifest(&bookkeeper, input, output, &config.extract.manifest_name)?;

    println!(
        "Extracted {} pages to {} ({} dropped)",
        extraction.report.pages.len(),
        output.display(),
        extraction.report.dropped
    );
    Ok(())
}

/// Print metadata for a single file.
fn cmd_info(config: &Config, path: &Path) -> anyhow::Result<()> {
    let bookkeeper = Bookkeeper::new(&config.pdf);
    let info = bookkeeper.book_info(path)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &info)?;
    writeln!(stdout)?;
    Ok(())
}
