use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use site_styler::apply::Document;
use site_styler::build;
use site_styler::build::version::BumpKind;
use site_styler::config::Config;
use site_styler::engine::{ConfigManager, RemoteConfigManager};
use site_styler::init::setup_logging;
use site_styler::loader::ResourceLoader;
use site_styler::session::PageSession;

#[derive(Parser)]
#[command(name = "site-styler", version, about = "Per-site stylesheet resolver and injector")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for a page URL and emit the injected styles.
    Apply {
        url: String,
        /// Write the rendered <style> blocks here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve a hostname (or URL) and print the stylesheet identifier.
    Resolve { host: String },
    /// Render headers, generate match patterns and copy CSS assets.
    Build,
    /// Bump the semantic version across the version file and templates.
    Bump {
        #[arg(value_enum, default_value = "patch")]
        kind: BumpKind,
        #[arg(long)]
        dry_run: bool,
    },
    /// Set the version to an explicit x.y.z, or back to 0.0.1.
    Reset {
        version: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Commit, tag and push the current version.
    Release {
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config).await?
    } else {
        Config::default()
    };
    setup_logging(&config);
    if !cli.config.exists() {
        info!("Config file not found, using defaults.");
    }

    match cli.command {
        Command::Apply { url, out } => apply(config, &url, out).await,
        Command::Resolve { host } => resolve(config, &host).await,
        Command::Build => build::run(&config.build).await,
        Command::Bump { kind, dry_run } => {
            build::version::bump_files(&config.build, kind, dry_run).await?;
            Ok(())
        }
        Command::Reset { version, dry_run } => {
            build::version::set_files(&config.build, version.as_deref(), dry_run).await?;
            Ok(())
        }
        Command::Release { dry_run } => {
            let version = build::version::read_version(&config.build.version_file).await?;
            build::release::release(&version.version, dry_run).await
        }
    }
}

async fn apply(config: Config, url: &str, out: Option<PathBuf>) -> Result<()> {
    let mut session = PageSession::new(config);
    let mut doc = Document::with_head();

    match session.run(url, &mut doc).await? {
        Some(resolution) => info!("Resolved style: {}", resolution.style),
        None => info!("Page left unstyled"),
    }

    let rendered = doc.render_head();
    match out {
        Some(path) => tokio::fs::write(&path, rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

async fn resolve(config: Config, host: &str) -> Result<()> {
    // Accept either a bare hostname or a full URL.
    let (hostname, full_url) = if host.contains("://") {
        let url = Url::parse(host).context("Invalid URL")?;
        (
            url.host_str().unwrap_or_default().to_string(),
            Some(host.to_string()),
        )
    } else {
        (host.to_string(), None)
    };

    let loader = Arc::new(ResourceLoader::new(
        &config.cache,
        Duration::from_millis(config.fetch_timeout_ms),
    ));
    let manager = RemoteConfigManager::new(config, loader);
    let matcher = manager.refresh().await;

    match matcher.resolve(&hostname, full_url.as_deref()) {
        Some(resolution) => {
            println!("{}", resolution.style);
            if resolution.fonts {
                info!("Shared font sheet would also load");
            }
        }
        None => println!("(no match)"),
    }
    Ok(())
}
