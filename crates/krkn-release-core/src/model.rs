//! リリース定義のデータモデル

use crate::error::{ReleaseError, Result};
use crate::secret::SecretRef;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// タグ push のrefプレフィックス
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// 未バージョンのイメージに付くタグ
pub const LATEST_TAG: &str = "latest";

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+$").expect("valid version pattern"));

/// セマンティックバージョンのリリースタグ (例: `v2.4.0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    /// `vMAJOR.MINOR.PATCH` 形式の文字列をパース
    pub fn parse(value: &str) -> Result<Self> {
        if VERSION_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ReleaseError::InvalidVersionTag(value.to_string()))
        }
    }

    /// `refs/tags/v1.2.3` 形式のrefからタグを取り出す
    ///
    /// タグrefでない、またはバージョン形式でない場合は None
    pub fn from_ref(raw_ref: &str) -> Option<Self> {
        raw_ref
            .strip_prefix(TAG_REF_PREFIX)
            .and_then(|tag| Self::parse(tag).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for VersionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// 完全修飾のイメージ名
///
/// タグなしの場合は `latest` として扱われるが、表示上はタグを付けない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageReference {
    repository: String,
    tag: Option<String>,
}

impl ImageReference {
    pub fn unversioned(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: None,
        }
    }

    pub fn versioned(repository: impl Into<String>, version: &VersionTag) -> Self {
        Self {
            repository: repository.into(),
            tag: Some(version.to_string()),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn tag_or_latest(&self) -> &str {
        self.tag.as_deref().unwrap_or(LATEST_TAG)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}

impl Serialize for ImageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 2つあるレジストリターゲットのどちらか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSlot {
    /// target1: ビルドタグと下流トリガーの認証に使う
    Primary,
    /// target2
    Secondary,
}

impl fmt::Display for TargetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSlot::Primary => f.write_str("target1"),
            TargetSlot::Secondary => f.write_str("target2"),
        }
    }
}

/// プッシュ先レジストリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryTarget {
    /// ターゲット名 (例: "krkn-chaos")
    pub name: String,

    /// ログイン先のレジストリホスト (例: "quay.io")
    pub registry: String,

    /// イメージの名前空間 (例: "quay.io/krkn-chaos")
    pub namespace: String,

    /// ユーザー名の参照
    pub username: SecretRef,

    /// トークンの参照
    pub token: SecretRef,
}

impl RegistryTarget {
    /// `{namespace}/{image}`
    pub fn repository(&self, image: &str) -> String {
        format!("{}/{}", self.namespace, image)
    }

    pub fn unversioned(&self, image: &str) -> ImageReference {
        ImageReference::unversioned(self.repository(image))
    }

    pub fn versioned(&self, image: &str, version: &VersionTag) -> ImageReference {
        ImageReference::versioned(self.repository(image), version)
    }
}

/// ビルドしたイメージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    /// ビルド時に付けたタグ
    pub base_tag: String,

    /// 追加で付けたタグ
    pub applied_tags: BTreeSet<String>,
}

impl ImageArtifact {
    pub fn new(base_tag: impl Into<String>) -> Self {
        Self {
            base_tag: base_tag.into(),
            applied_tags: BTreeSet::new(),
        }
    }
}

/// ソース取得の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// cloneするリポジトリ。None の場合は既存のワークツリーを使う
    pub repository: Option<String>,

    /// ワークツリーのパス（release.kdl からの相対）
    pub path: PathBuf,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            repository: None,
            path: PathBuf::from("."),
        }
    }
}

/// ビルドの設定（ワークツリーからの相対パス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub script: PathBuf,
}

impl BuildSettings {
    /// context を基準にデフォルト値を埋める
    pub fn with_context(context: PathBuf) -> Self {
        Self {
            dockerfile: context.join("Dockerfile"),
            script: context.join("compile_dockerfile.sh"),
            context,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::with_context(PathBuf::from("."))
    }
}

/// 下流リビルドの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamSettings {
    /// 実行するコマンドと引数
    pub command: Vec<String>,

    /// autopush フラグの参照
    pub autopush: SecretRef,
}

/// release.kdl 全体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// リリース名
    pub name: String,

    /// イメージ名 (例: "krkn")
    pub image: String,

    /// release.kdl のあるディレクトリ
    pub root: PathBuf,

    pub checkout: CheckoutSettings,

    pub build: BuildSettings,

    /// [target1, target2]
    pub targets: [RegistryTarget; 2],

    pub downstream: Option<DownstreamSettings>,
}

impl ReleaseConfig {
    pub fn target(&self, slot: TargetSlot) -> &RegistryTarget {
        match slot {
            TargetSlot::Primary => &self.targets[0],
            TargetSlot::Secondary => &self.targets[1],
        }
    }

    pub fn primary(&self) -> &RegistryTarget {
        self.target(TargetSlot::Primary)
    }

    pub fn secondary(&self) -> &RegistryTarget {
        self.target(TargetSlot::Secondary)
    }

    /// ビルド時のタグ（target1 の未バージョン名）
    pub fn build_reference(&self) -> ImageReference {
        self.primary().unversioned(&self.image)
    }

    /// ワークツリーの絶対パス
    pub fn working_tree(&self) -> PathBuf {
        self.root.join(&self.checkout.path)
    }
}
