//! 下流リビルドのトリガー
//!
//! 設定されたコマンドを実行する。認証情報は引数ではなく環境変数で渡す。
//! 子プロセスの stdout は stderr に流し、stdout は結果出力 (`--json`) 用に空けておく。

use async_trait::async_trait;
use krkn_release_core::{CredentialPair, DownstreamRebuild, ReleaseError, Secret};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

pub const USER_ENV: &str = "QUAY_USER";
pub const TOKEN_ENV: &str = "QUAY_TOKEN";
pub const AUTOPUSH_ENV: &str = "AUTOPUSH";

pub struct CommandDownstream {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandDownstream {
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Self {
        Self { command, cwd }
    }
}

#[async_trait]
impl DownstreamRebuild for CommandDownstream {
    async fn trigger(
        &self,
        credentials: &CredentialPair,
        autopush: &Secret<bool>,
    ) -> krkn_release_core::Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ReleaseError::Downstream("コマンドが空です".to_string()))?;

        tracing::info!("Triggering downstream rebuild: {}", program);

        let status = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .env(USER_ENV, credentials.username.expose())
            .env(TOKEN_ENV, credentials.token.expose())
            .env(AUTOPUSH_ENV, autopush.expose().to_string())
            .stdout(Stdio::from(std::io::stderr()))
            .status()
            .await
            .map_err(|e| ReleaseError::Downstream(format!("{}: {}", program, e)))?;

        if !status.success() {
            return Err(ReleaseError::Downstream(format!(
                "{} が終了コード {} で失敗しました",
                program,
                status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "不明".to_string())
            )));
        }

        Ok(())
    }
}
