use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::progress::BuildProgress;
use async_trait::async_trait;
use bollard::Docker;
use bytes::Bytes;
use colored::Colorize;
use futures_util::stream::StreamExt;
use http_body_util::{Either, Full};
use krkn_release_core::{BuildImage, BuildRequest, ImageArtifact, ReleaseError};
use std::collections::{BTreeMap, HashMap};

pub struct DockerImageBuilder {
    docker: Docker,
}

impl DockerImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルド
    pub async fn build_image(
        &self,
        context: BuildContext,
        tag: &str,
        build_args: &BTreeMap<String, String>,
        no_cache: bool,
    ) -> BuildResult<()> {
        tracing::info!("Building image: {}", tag);

        let build_args_refs: HashMap<&str, &str> = build_args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions {
            dockerfile: context.dockerfile.as_str(),
            t: tag,
            buildargs: build_args_refs,
            nocache: no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull: true,    // ベースイメージを常にpull
            ..Default::default()
        };

        tracing::debug!("Build args: {:?}", build_args);

        let body = Full::new(Bytes::from(context.archive));
        #[allow(deprecated)]
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        let progress = BuildProgress::new(tag);

        while let Some(msg) = stream.next().await {
            let result = match msg {
                Ok(output) => handle_build_output(&progress, output),
                Err(e) => Err(BuildError::DockerConnection(e)),
            };
            if let Err(e) = result {
                progress.finish_error(&e.to_string());
                return Err(e);
            }
        }

        progress.finish_success();
        tracing::info!("Successfully built: {}", tag);
        Ok(())
    }
}

/// ビルド出力の処理
fn handle_build_output(
    progress: &BuildProgress,
    output: bollard::models::BuildInfo,
) -> BuildResult<()> {
    if let Some(stream) = output.stream {
        if let Some(step) = stream.lines().find(|l| l.starts_with("Step ")) {
            progress.set_message(step);
        }
        progress.print(&stream);
    }

    if let Some(error) = output.error {
        return Err(BuildError::BuildFailed(error));
    }

    if let Some(error_detail) = output.error_detail {
        let error_msg = error_detail
            .message
            .unwrap_or_else(|| "Unknown build error".to_string());
        return Err(BuildError::BuildFailed(error_msg));
    }

    if let Some(status) = output.status {
        progress.print(&format!("{}\n", status.cyan()));
    }

    Ok(())
}

#[async_trait]
impl BuildImage for DockerImageBuilder {
    async fn build(&self, request: &BuildRequest) -> krkn_release_core::Result<ImageArtifact> {
        let tag = request.image.to_string();

        let context = BuildContext::create(&request.context, &request.dockerfile)
            .map_err(|e| ReleaseError::Build(e.user_message()))?;

        self.build_image(context, &tag, &request.build_args, request.no_cache)
            .await
            .map_err(|e| ReleaseError::Build(e.user_message()))?;

        Ok(ImageArtifact::new(tag))
    }
}
