//! イメージプッシュ処理
//!
//! タグ付け済みのイメージを、ログイン済みセッションの認証情報でプッシュします。

use crate::auth::docker_credentials;
use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;
use krkn_release_core::{ImageReference, PushImage, RegistrySession, ReleaseError};
use std::io::Write;

/// イメージプッシュを実行するハンドラ
pub struct DockerImagePusher {
    docker: Docker,
}

impl DockerImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// セッションのレジストリとイメージのレジストリが異なる場合は送信しない。
    pub async fn push_image(
        &self,
        session: &RegistrySession,
        reference: &ImageReference,
    ) -> BuildResult<()> {
        let tag = reference.tag_or_latest();
        validate_tag(tag)?;

        ensure_session_matches(session, reference)?;

        let credentials = docker_credentials(session.registry(), session.credentials());

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        eprintln!("  → {}", reference.to_string().cyan());

        #[allow(deprecated)]
        let mut stream =
            self.docker
                .push_image(reference.repository(), Some(options), Some(credentials));

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        handle_progress(&info, &mut last_status);
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        // 最終行の改行
        eprintln!();

        if let Some(err) = error_message {
            return Err(BuildError::PushFailed { message: err });
        }

        Ok(())
    }
}

#[async_trait]
impl PushImage for DockerImagePusher {
    async fn push(
        &self,
        session: &RegistrySession,
        reference: &ImageReference,
    ) -> krkn_release_core::Result<()> {
        self.push_image(session, reference)
            .await
            .map_err(|e| ReleaseError::Push {
                reference: reference.to_string(),
                message: e.to_string(),
            })
    }
}

/// イメージ名がセッションのレジストリ配下にあるか
fn ensure_session_matches(session: &RegistrySession, reference: &ImageReference) -> BuildResult<()> {
    let prefix = format!("{}/", session.registry());
    if reference.repository().starts_with(&prefix) {
        return Ok(());
    }

    Err(BuildError::AuthFailed {
        registry: session.registry().to_string(),
        message: format!(
            "{} のセッションでは {} にプッシュできません",
            session.registry(),
            reference
        ),
    })
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// プッシュ進捗を表示
fn handle_progress(info: &PushImageInfo, last_status: &mut String) {
    if let Some(status) = &info.status {
        let progress = info.progress.as_deref().unwrap_or("");

        match status.as_str() {
            "Pushing" => {
                eprint!("\r  ↑ {} {}     ", status, progress);
                std::io::stderr().flush().ok();
            }
            "Pushed" => {
                eprintln!("\r  {} Pushed                    ", "✓".green());
            }
            "Layer already exists" => {
                eprintln!("\r  {} Layer already exists      ", "✓".green());
            }
            "Preparing" | "Waiting" => {
                // 準備中は表示をスキップ（ノイズ軽減）
            }
            _ => {
                if status != last_status {
                    eprintln!("\r  ℹ {}                    ", status);
                    *last_status = status.clone();
                }
            }
        }
    }
}
