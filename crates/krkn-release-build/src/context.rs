use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::Builder;

/// コンテキスト外の Dockerfile を格納する名前
const EXTERNAL_DOCKERFILE: &str = "Dockerfile";

/// tar.gz 化したビルドコンテキスト
#[derive(Debug)]
pub struct BuildContext {
    pub archive: Vec<u8>,

    /// アーカイブ内の Dockerfile のパス
    pub dockerfile: String,
}

impl BuildContext {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// Dockerfile がコンテキスト内にあればそのパスをそのまま使い、
    /// 外にあれば `Dockerfile` としてアーカイブのルートに追加する。
    pub fn create(context_path: &Path, dockerfile_path: &Path) -> BuildResult<Self> {
        if !context_path.is_dir() {
            return Err(BuildError::ContextNotFound(context_path.to_path_buf()));
        }
        if !dockerfile_path.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile_path.to_path_buf()));
        }

        tracing::debug!("Creating build context from: {}", context_path.display());

        let inner = dockerfile_path
            .strip_prefix(context_path)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"));

        let mut archive = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive, Compression::default());
            let mut tar = Builder::new(encoder);

            // コンテキストディレクトリを再帰的に追加
            tar.append_dir_all(".", context_path)?;

            if inner.is_none() {
                let content = std::fs::read(dockerfile_path)?;

                let mut header = tar::Header::new_gnu();
                header.set_path(EXTERNAL_DOCKERFILE).map_err(|e| {
                    BuildError::BuildFailed(format!("Failed to set Dockerfile path: {}", e))
                })?;
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();

                tar.append(&header, &content[..])?;
            }

            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive.len());

        Self::check_context_size(archive.len());

        Ok(Self {
            archive,
            dockerfile: inner.unwrap_or_else(|| EXTERNAL_DOCKERFILE.to_string()),
        })
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}
