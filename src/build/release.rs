use anyhow::{ensure, Context, Result};
use tokio::process::Command;
use tracing::info;

/// Commits the bumped version, tags it `v<version>` and pushes with tags.
/// With `dry_run` the git commands are logged instead of executed.
pub async fn release(version: &str, dry_run: bool) -> Result<()> {
    let message = format!("Release v{version}");
    let tag = format!("v{version}");
    let steps: Vec<Vec<&str>> = vec![
        vec!["add", "-A"],
        vec!["commit", "-m", &message],
        vec!["tag", &tag],
        vec!["push", "--follow-tags"],
    ];

    for args in &steps {
        if dry_run {
            info!("Dry run: git {}", args.join(" "));
            continue;
        }
        run_git(args).await?;
    }

    if !dry_run {
        info!("Released {}", tag);
    }
    Ok(())
}

async fn run_git(args: &[&str]) -> Result<()> {
    let status = Command::new("git")
        .args(args)
        .status()
        .await
        .context("Failed to spawn git")?;
    ensure!(
        status.success(),
        "git {} exited with {}",
        args.join(" "),
        status
    );
    Ok(())
}
