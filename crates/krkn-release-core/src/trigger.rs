//! トリガーの判定
//!
//! CLI の明示指定、または CI 環境 (GitHub Actions の規約) から
//! [`TriggerContext`] を組み立てる。どちらにも当てはまらない場合は
//! `None` となり、オーケストレーターは何もしない。

use crate::error::{ReleaseError, Result};
use crate::model::{TAG_REF_PREFIX, VersionTag};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

const PULL_REF_PREFIX: &str = "refs/pull/";

/// 実行のきっかけ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerContext {
    /// `vMAJOR.MINOR.PATCH` タグの push
    TagPush(VersionTag),
    /// プルリクエスト
    PullRequest(u64),
}

impl TriggerContext {
    pub fn event_kind(&self) -> &'static str {
        match self {
            TriggerContext::TagPush(_) => "tag_push",
            TriggerContext::PullRequest(_) => "pull_request",
        }
    }

    pub fn version(&self) -> Option<&VersionTag> {
        match self {
            TriggerContext::TagPush(version) => Some(version),
            TriggerContext::PullRequest(_) => None,
        }
    }
}

impl fmt::Display for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerContext::TagPush(version) => write!(f, "tag push {}", version),
            TriggerContext::PullRequest(number) => write!(f, "pull request #{}", number),
        }
    }
}

/// CLI から明示されたトリガー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOverride {
    /// `--tag v1.2.3`
    Tag(String),
    /// `--pr 137`
    PullRequest(u64),
    /// `--ref refs/tags/v1.2.3`
    Ref(String),
}

/// CI 環境から読み取った値
#[derive(Debug, Clone, Default)]
pub struct CiEnvironment {
    /// `GITHUB_EVENT_NAME`
    pub event_name: Option<String>,

    /// `GITHUB_REF`
    pub git_ref: Option<String>,

    /// `GITHUB_EVENT_PATH` の JSON
    pub event_payload: Option<serde_json::Value>,
}

impl CiEnvironment {
    /// プロセス環境変数から読み込む
    ///
    /// ペイロードは PR 番号が必要なプルリクエストイベントでだけ読む。
    pub fn from_env() -> Result<Self> {
        let event_name = non_empty_var("GITHUB_EVENT_NAME");
        let git_ref = non_empty_var("GITHUB_REF");

        let event_payload = match (event_name.as_deref(), non_empty_var("GITHUB_EVENT_PATH")) {
            (Some(event), Some(path)) if is_pull_request_event(event) => {
                Some(read_payload(PathBuf::from(path))?)
            }
            _ => None,
        };

        Ok(Self {
            event_name,
            git_ref,
            event_payload,
        })
    }

    /// イベントからトリガーを判定
    pub fn detect(&self) -> Option<TriggerContext> {
        let event = self.event_name.as_deref()?;
        debug!(event = %event, git_ref = ?self.git_ref, "Detecting trigger from CI environment");

        match event {
            "push" => self
                .git_ref
                .as_deref()
                .and_then(VersionTag::from_ref)
                .map(TriggerContext::TagPush),
            event if is_pull_request_event(event) => {
                self.pull_request_number().map(TriggerContext::PullRequest)
            }
            _ => None,
        }
    }

    fn pull_request_number(&self) -> Option<u64> {
        if let Some(payload) = &self.event_payload {
            let number = payload
                .get("pull_request")
                .and_then(|pr| pr.get("number"))
                .or_else(|| payload.get("number"))
                .and_then(|n| n.as_u64());
            if number.is_some() {
                return number;
            }
        }

        self.git_ref.as_deref().and_then(parse_pull_ref)
    }
}

fn is_pull_request_event(event: &str) -> bool {
    matches!(event, "pull_request" | "pull_request_target")
}

/// 明示指定と CI 環境からトリガーを決定
///
/// 明示指定が優先される。`--tag` の値がバージョン形式でない場合はエラー。
pub fn resolve_trigger(
    explicit: Option<&TriggerOverride>,
    ci: &CiEnvironment,
) -> Result<Option<TriggerContext>> {
    let trigger = match explicit {
        Some(TriggerOverride::Tag(tag)) => {
            let tag = tag.strip_prefix(TAG_REF_PREFIX).unwrap_or(tag);
            Some(TriggerContext::TagPush(VersionTag::parse(tag)?))
        }
        Some(TriggerOverride::PullRequest(number)) => Some(TriggerContext::PullRequest(*number)),
        Some(TriggerOverride::Ref(raw_ref)) => from_ref(raw_ref),
        None => ci.detect(),
    };

    match &trigger {
        Some(t) => info!(event = t.event_kind(), trigger = %t, "Trigger resolved"),
        None => info!("No qualifying trigger"),
    }

    Ok(trigger)
}

/// refの形だけで判定する（タグrefかプルリクエストref）
fn from_ref(raw_ref: &str) -> Option<TriggerContext> {
    VersionTag::from_ref(raw_ref)
        .map(TriggerContext::TagPush)
        .or_else(|| parse_pull_ref(raw_ref).map(TriggerContext::PullRequest))
}

/// `refs/pull/137/merge` → 137
fn parse_pull_ref(raw_ref: &str) -> Option<u64> {
    raw_ref
        .strip_prefix(PULL_REF_PREFIX)?
        .split('/')
        .next()?
        .parse()
        .ok()
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_payload(path: PathBuf) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(&path).map_err(|e| ReleaseError::EventPayload {
        path: path.clone(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| ReleaseError::EventPayload {
        path,
        message: e.to_string(),
    })
}
