//! ローカルイメージへのタグ付け

use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use bollard::Docker;
use krkn_release_core::{ImageArtifact, ImageReference, ReleaseError, TagImage};

pub struct DockerImageTagger {
    docker: Docker,
}

impl DockerImageTagger {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージの存在確認
    pub async fn image_exists(&self, image_tag: &str) -> BuildResult<bool> {
        match self.docker.inspect_image(image_tag).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(BuildError::DockerConnection(e)),
        }
    }

    /// `source` に `destination` の名前を付ける
    pub async fn tag_image(&self, source: &str, destination: &ImageReference) -> BuildResult<()> {
        if !self.image_exists(source).await? {
            return Err(BuildError::ImageNotFound(source.to_string()));
        }

        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions {
            repo: destination.repository(),
            tag: destination.tag_or_latest(),
        };

        self.docker.tag_image(source, Some(options)).await?;

        tracing::debug!("Tagged {} as {}", source, destination);
        Ok(())
    }
}

#[async_trait]
impl TagImage for DockerImageTagger {
    async fn tag(
        &self,
        source: &ImageArtifact,
        destination: &ImageReference,
    ) -> krkn_release_core::Result<()> {
        self.tag_image(&source.base_tag, destination)
            .await
            .map_err(|e| ReleaseError::Tag {
                reference: destination.to_string(),
                message: e.user_message(),
            })
    }
}
