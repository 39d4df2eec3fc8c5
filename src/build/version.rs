use super::headers::stamp_version;
use crate::config::BuildConfig;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Contents of the version file (`version.json`).
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
}

impl BumpKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

pub async fn read_version(path: &str) -> Result<VersionInfo> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read version file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse version file {path}"))
}

/// Version a bare `reset` falls back to.
pub const RESET_VERSION: &str = "0.0.1";

fn parse_parts(version: &str) -> Result<(u64, u64, u64)> {
    let parts: Vec<&str> = version.trim().split('.').collect();
    let [major, minor, patch] = parts.as_slice() else {
        bail!("Version '{}' is not of the form x.y.z", version);
    };
    let major: u64 = major.parse().context("Bad major component")?;
    let minor: u64 = minor.parse().context("Bad minor component")?;
    let patch: u64 = patch.parse().context("Bad patch component")?;
    Ok((major, minor, patch))
}

/// Increments an `x.y.z` version, zeroing the lower components.
pub fn bump(version: &str, kind: BumpKind) -> Result<String> {
    let (major, minor, patch) = parse_parts(version)?;
    Ok(match kind {
        BumpKind::Major => format!("{}.0.0", major + 1),
        BumpKind::Minor => format!("{}.{}.0", major, minor + 1),
        BumpKind::Patch => format!("{}.{}.{}", major, minor, patch + 1),
    })
}

/// Bumps the version file and restamps every header template. With
/// `dry_run` the new version is computed and logged but nothing is
/// written.
pub async fn bump_files(config: &BuildConfig, kind: BumpKind, dry_run: bool) -> Result<String> {
    let info = read_version(&config.version_file).await?;
    let old = info.version.clone();
    let new = bump(&old, kind)?;
    let description = format!("Updated {} version", kind.as_str());

    if dry_run {
        info!("Dry run: would bump version from {} to {}", old, new);
        return Ok(new);
    }

    write_files(config, info, &new, description).await?;
    info!("Version bumped from {} to {}", old, new);
    Ok(new)
}

/// Forces the version to an explicit value, or back to `0.0.1` when none
/// is given, restamping the templates the same way a bump does.
pub async fn set_files(
    config: &BuildConfig,
    version: Option<&str>,
    dry_run: bool,
) -> Result<String> {
    let (new, description) = match version {
        Some(v) => {
            parse_parts(v)?;
            (v.trim().to_string(), "Manual version set".to_string())
        }
        None => (
            RESET_VERSION.to_string(),
            format!("Version reset to {RESET_VERSION}"),
        ),
    };

    let info = read_version(&config.version_file).await?;
    let old = info.version.clone();

    if dry_run {
        info!("Dry run: would set version from {} to {}", old, new);
        return Ok(new);
    }

    write_files(config, info, &new, description).await?;
    info!("Version set from {} to {}", old, new);
    Ok(new)
}

async fn write_files(
    config: &BuildConfig,
    mut info: VersionInfo,
    new: &str,
    description: String,
) -> Result<()> {
    info.version = new.to_string();
    info.last_updated = Some(Utc::now().format("%Y-%m-%d").to_string());
    info.description = Some(description);

    let serialized = serde_json::to_string_pretty(&info).context("Failed to serialize version")?;
    fs::write(&config.version_file, serialized)
        .await
        .with_context(|| format!("Failed to write version file {}", config.version_file))?;

    let mut entries = fs::read_dir(&config.templates_dir)
        .await
        .with_context(|| format!("Failed to read templates dir {}", config.templates_dir))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "headers") {
            continue;
        }
        let text = fs::read_to_string(&path).await?;
        let stamped = stamp_version(&text, new);
        if stamped != text {
            fs::write(&path, stamped).await?;
            info!("Template updated: {}", path.display());
        }
    }

    Ok(())
}
