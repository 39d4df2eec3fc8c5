//! Build-time surface: renders userscript metadata headers, generates
//! `@match` patterns from the domain map, copies CSS assets to the dist
//! directory and handles version bumps and releases.

pub mod assets;
pub mod headers;
pub mod matches;
pub mod release;
pub mod version;

use crate::config::BuildConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// Runs the full build: match generation, header rendering and asset copy.
pub async fn run(config: &BuildConfig) -> Result<()> {
    let map = matches::load_domain_map(&config.domain_map).await?;
    let match_lines = matches::generate_match_lines(&map);
    info!("Generated {} match patterns", match_lines.len());

    let version = version::read_version(&config.version_file).await?;

    let payload = match &config.payload {
        Some(path) => Some(
            fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read payload {path}"))?,
        ),
        None => None,
    };

    let dist = Path::new(&config.dist_dir);
    fs::create_dir_all(dist)
        .await
        .context("Failed to create dist directory")?;

    let mut rendered = 0;
    let mut entries = fs::read_dir(&config.templates_dir)
        .await
        .with_context(|| format!("Failed to read templates dir {}", config.templates_dir))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "headers") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let template = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        let header = headers::render_header(&template, &match_lines, &version.version);

        // The .meta.js carries the header alone, for update checks.
        fs::write(dist.join(format!("{stem}.meta.js")), &header).await?;

        let script = match &payload {
            Some(body) => format!("{header}\n\n{body}"),
            None => header.clone(),
        };
        fs::write(dist.join(format!("{stem}.js")), script).await?;
        rendered += 1;
        info!("Rendered {stem}.js / {stem}.meta.js");
    }
    if rendered == 0 {
        warn!("No .headers templates found in {}", config.templates_dir);
    }

    let copied = assets::copy_assets(
        Path::new(&config.styles_dir),
        &dist.join("styles"),
        config.concurrent_copies,
    )
    .await?;
    info!("Copied {} CSS assets", copied);

    Ok(())
}
