//! ソースの取得
//!
//! リポジトリが指定されていればトリガーに応じた ref を git で取得し、
//! なければ既存のワークツリー (CI のチェックアウト済みディレクトリ) をそのまま使う。

use crate::command::run_command;
use crate::error::BuildResult;
use async_trait::async_trait;
use krkn_release_core::{Checkout, ReleaseError, TriggerContext, WorkingTree};
use std::path::PathBuf;

pub struct GitCheckout {
    path: PathBuf,
    repository: Option<String>,
}

impl GitCheckout {
    pub fn new(path: PathBuf, repository: Option<String>) -> Self {
        Self { path, repository }
    }

    async fn fetch(&self, repository: &str, trigger: &TriggerContext) -> BuildResult<()> {
        let path = self.path.to_string_lossy().to_string();

        if !self.path.join(".git").exists() {
            match trigger {
                TriggerContext::TagPush(version) => {
                    run_command(
                        "git",
                        &[
                            "clone",
                            "--depth",
                            "1",
                            "--branch",
                            version.as_str(),
                            repository,
                            &path,
                        ],
                        None,
                    )
                    .await?;
                    return Ok(());
                }
                TriggerContext::PullRequest(_) => {
                    run_command("git", &["clone", repository, &path], None).await?;
                }
            }
        }

        let (refspec, target) = match trigger {
            TriggerContext::TagPush(version) => (
                format!("refs/tags/{0}:refs/tags/{0}", version),
                version.to_string(),
            ),
            TriggerContext::PullRequest(number) => (
                format!("pull/{0}/head:pr-{0}", number),
                format!("pr-{}", number),
            ),
        };

        run_command(
            "git",
            &["fetch", "--force", repository, &refspec],
            Some(&self.path),
        )
        .await?;
        run_command("git", &["checkout", "--force", &target], Some(&self.path)).await?;
        Ok(())
    }
}

#[async_trait]
impl Checkout for GitCheckout {
    async fn checkout(&self, trigger: &TriggerContext) -> krkn_release_core::Result<WorkingTree> {
        match &self.repository {
            Some(repository) => {
                tracing::info!("Fetching {} for {}", repository, trigger);
                self.fetch(repository, trigger)
                    .await
                    .map_err(|e| ReleaseError::Checkout(e.to_string()))?;
            }
            None => {
                if !self.path.is_dir() {
                    return Err(ReleaseError::Checkout(format!(
                        "ワークツリーが存在しません: {}",
                        self.path.display()
                    )));
                }
                tracing::debug!("Using existing working tree: {}", self.path.display());
            }
        }

        Ok(WorkingTree::new(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krkn_release_core::VersionTag;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_checkout_existing_tree() {
        let dir = tempdir().unwrap();
        let checkout = GitCheckout::new(dir.path().to_path_buf(), None);

        let tree = checkout
            .checkout(&TriggerContext::PullRequest(1))
            .await
            .unwrap();
        assert_eq!(tree.root, dir.path());
    }

    #[tokio::test]
    async fn test_checkout_missing_tree() {
        let dir = tempdir().unwrap();
        let checkout = GitCheckout::new(dir.path().join("missing"), None);

        let result = checkout
            .checkout(&TriggerContext::TagPush(VersionTag::parse("v1.0.0").unwrap()))
            .await;
        assert!(matches!(result, Err(ReleaseError::Checkout(_))));
    }

    #[tokio::test]
    async fn test_checkout_clone_failure() {
        let dir = tempdir().unwrap();
        let checkout = GitCheckout::new(
            dir.path().join("src"),
            Some(dir.path().join("no-such-repo").to_string_lossy().to_string()),
        );

        let result = checkout.checkout(&TriggerContext::PullRequest(5)).await;
        assert!(matches!(result, Err(ReleaseError::Checkout(_))));
    }
}
