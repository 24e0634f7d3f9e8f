//! Dockerfile 生成スクリプトの実行

use crate::command::run_command;
use async_trait::async_trait;
use krkn_release_core::{MaterializeDockerfile, ReleaseError, WorkingTree};
use std::path::Path;

/// スクリプトを bash で実行する
///
/// カレントディレクトリはスクリプトのあるディレクトリ。
#[derive(Default)]
pub struct ScriptMaterializer;

impl ScriptMaterializer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MaterializeDockerfile for ScriptMaterializer {
    async fn materialize(
        &self,
        tree: &WorkingTree,
        script: &Path,
    ) -> krkn_release_core::Result<()> {
        let path = tree.resolve(script);
        if !path.is_file() {
            return Err(ReleaseError::Materialize(format!(
                "スクリプトが見つかりません: {}",
                path.display()
            )));
        }

        let dir = path.parent().unwrap_or(tree.root.as_path());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::info!("Materializing Dockerfile with {}", path.display());

        let stdout = run_command("bash", &[name.as_str()], Some(dir))
            .await
            .map_err(|e| ReleaseError::Materialize(e.to_string()))?;
        if !stdout.trim().is_empty() {
            tracing::debug!("{}", stdout.trim());
        }
        Ok(())
    }
}
