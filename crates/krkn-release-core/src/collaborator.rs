//! 外部コラボレーターのインターフェース
//!
//! チェックアウト、Dockerfile生成、ビルド、タグ付け、ログイン、プッシュ、
//! 下流トリガーをそれぞれ1メソッドのトレイトとして定義する。
//! 実装は krkn-release-build クレートにあり、テストではフェイクを使う。

use crate::error::Result;
use crate::model::{ImageArtifact, ImageReference, TargetSlot};
use crate::secret::{CredentialPair, Secret};
use crate::trigger::TriggerContext;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// チェックアウト済みのソースツリー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTree {
    pub root: PathBuf,
}

impl WorkingTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// ツリー内の相対パスを絶対パスに
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// ビルドの入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub image: ImageReference,
    pub build_args: BTreeMap<String, String>,
    pub no_cache: bool,
}

/// 1つのターゲットに対するログイン状態
///
/// 直後のプッシュにのみ使う。ターゲットをまたいで再利用しない。
#[derive(Debug, Clone)]
pub struct RegistrySession {
    target: TargetSlot,
    registry: String,
    credentials: CredentialPair,
}

impl RegistrySession {
    pub fn new(target: TargetSlot, registry: impl Into<String>, credentials: CredentialPair) -> Self {
        Self {
            target,
            registry: registry.into(),
            credentials,
        }
    }

    pub fn target(&self) -> TargetSlot {
        self.target
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn credentials(&self) -> &CredentialPair {
        &self.credentials
    }
}

#[async_trait]
pub trait Checkout: Send + Sync {
    async fn checkout(&self, trigger: &TriggerContext) -> Result<WorkingTree>;
}

#[async_trait]
pub trait MaterializeDockerfile: Send + Sync {
    async fn materialize(&self, tree: &WorkingTree, script: &Path) -> Result<()>;
}

#[async_trait]
pub trait BuildImage: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<ImageArtifact>;
}

#[async_trait]
pub trait TagImage: Send + Sync {
    /// ローカルのイメージに別名を付ける。元イメージがない場合のみ失敗する
    async fn tag(&self, source: &ImageArtifact, destination: &ImageReference) -> Result<()>;
}

#[async_trait]
pub trait LoginRegistry: Send + Sync {
    async fn login(
        &self,
        target: TargetSlot,
        registry: &str,
        credentials: &CredentialPair,
    ) -> Result<RegistrySession>;
}

#[async_trait]
pub trait PushImage: Send + Sync {
    async fn push(&self, session: &RegistrySession, reference: &ImageReference) -> Result<()>;
}

#[async_trait]
pub trait DownstreamRebuild: Send + Sync {
    async fn trigger(&self, credentials: &CredentialPair, autopush: &Secret<bool>) -> Result<()>;
}

/// オーケストレーターが使うコラボレーター一式
pub struct Collaborators {
    pub checkout: Box<dyn Checkout>,
    pub materializer: Box<dyn MaterializeDockerfile>,
    pub builder: Box<dyn BuildImage>,
    pub tagger: Box<dyn TagImage>,
    pub login: Box<dyn LoginRegistry>,
    pub pusher: Box<dyn PushImage>,
    pub downstream: Box<dyn DownstreamRebuild>,
}
