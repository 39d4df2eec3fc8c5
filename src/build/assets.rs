use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};

/// Copies every `.css` file from the styles directory into the dist
/// directory, a bounded number at a time.
pub async fn copy_assets(styles_dir: &Path, dist_dir: &Path, concurrency: usize) -> Result<usize> {
    fs::create_dir_all(dist_dir)
        .await
        .context("Failed to create dist styles directory")?;

    let mut sources: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(styles_dir)
        .await
        .with_context(|| format!("Failed to read styles dir {}", styles_dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "css") {
            sources.push(path);
        }
    }

    let tasks = sources.into_iter().map(|src| {
        let dest = dist_dir.join(src.file_name().unwrap_or_default());
        async move {
            match fs::copy(&src, &dest).await {
                Ok(_) => {
                    debug!("Copied {}", src.display());
                    true
                }
                Err(e) => {
                    error!("Failed to copy {}: {}", src.display(), e);
                    false
                }
            }
        }
    });

    let results: Vec<bool> = stream::iter(tasks).buffer_unordered(concurrency).collect().await;
    Ok(results.into_iter().filter(|ok| *ok).count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copies_only_css_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("github.css"), "body { }").unwrap();
        std::fs::write(src.path().join("fonts.css"), "@font-face { }").unwrap();
        std::fs::write(src.path().join("notes.txt"), "skip me").unwrap();

        let copied = copy_assets(src.path(), dst.path(), 4).await.unwrap();
        assert_eq!(copied, 2);
        assert!(dst.path().join("github.css").is_file());
        assert!(dst.path().join("fonts.css").is_file());
        assert!(!dst.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_styles_dir_is_an_error() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("nope");
        assert!(copy_assets(&missing, dst.path(), 2).await.is_err());
    }
}
