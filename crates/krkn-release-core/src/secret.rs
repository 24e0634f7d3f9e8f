//! シークレットの参照と解決
//!
//! release.kdl には値ではなく参照だけを書く。
//!
//! - `env:NAME`: 環境変数
//! - `op://Vault/Item/Field`: 1Password CLI
//! - それ以外の文字列: 環境変数名
//!
//! 解決した値は [`Secret`] に包まれ、Debug/Display では伏せ字になります。

use crate::error::{ReleaseError, Result};
use crate::model::{RegistryTarget, ReleaseConfig, TargetSlot};
use crate::onepassword;
use std::fmt;
use tracing::debug;

const ENV_PREFIX: &str = "env:";
const REDACTED: &str = "***";

/// ログに出さない値
#[derive(Clone, PartialEq, Eq)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// 生の値を取り出す（コラボレーターへ渡す直前でのみ使う）
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// レジストリ1つ分の認証情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub username: Secret<String>,
    pub token: Secret<String>,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: Secret::new(username.into()),
            token: Secret::new(token.into()),
        }
    }
}

/// シークレットの参照先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    Env(String),
    OnePassword(String),
}

impl SecretRef {
    pub fn parse(value: &str) -> Self {
        if value.starts_with(onepassword::PREFIX) {
            SecretRef::OnePassword(value.to_string())
        } else if let Some(name) = value.strip_prefix(ENV_PREFIX) {
            SecretRef::Env(name.to_string())
        } else {
            SecretRef::Env(value.to_string())
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRef::Env(name) => write!(f, "{}{}", ENV_PREFIX, name),
            SecretRef::OnePassword(reference) => f.write_str(reference),
        }
    }
}

/// 実行開始時に解決されるシークレット一式
///
/// オーケストレーターにはこの構造体を明示的に渡す。
#[derive(Debug, Clone)]
pub struct ReleaseSecrets {
    pub target1: CredentialPair,
    pub target2: CredentialPair,
    pub autopush: Secret<bool>,
}

impl ReleaseSecrets {
    /// 環境変数と 1Password から解決
    pub fn resolve(config: &ReleaseConfig) -> Result<Self> {
        Self::resolve_with(config, resolve_from_process)
    }

    /// 任意のリゾルバで解決
    pub fn resolve_with<F>(config: &ReleaseConfig, resolver: F) -> Result<Self>
    where
        F: Fn(&SecretRef) -> Result<String>,
    {
        let downstream = config.downstream.as_ref().ok_or_else(|| {
            ReleaseError::InvalidConfig(
                "タグ push のリリースには downstream ノードが必要です".to_string(),
            )
        })?;

        let target1 = resolve_pair(config.primary(), &resolver)?;
        let target2 = resolve_pair(config.secondary(), &resolver)?;

        let raw = resolve_non_empty(&downstream.autopush, &resolver)?;
        let autopush = parse_bool(&raw).ok_or_else(|| {
            ReleaseError::SecretUnavailable(format!(
                "{} は真偽値ではありません",
                downstream.autopush
            ))
        })?;

        debug!(
            target1 = %config.primary().name,
            target2 = %config.secondary().name,
            "Resolved release secrets"
        );

        Ok(Self {
            target1,
            target2,
            autopush: Secret::new(autopush),
        })
    }

    /// ターゲットに対応する認証情報
    pub fn credentials(&self, slot: TargetSlot) -> &CredentialPair {
        match slot {
            TargetSlot::Primary => &self.target1,
            TargetSlot::Secondary => &self.target2,
        }
    }
}

fn resolve_pair<F>(target: &RegistryTarget, resolver: &F) -> Result<CredentialPair>
where
    F: Fn(&SecretRef) -> Result<String>,
{
    Ok(CredentialPair {
        username: Secret::new(resolve_non_empty(&target.username, resolver)?),
        token: Secret::new(resolve_non_empty(&target.token, resolver)?),
    })
}

fn resolve_non_empty<F>(reference: &SecretRef, resolver: &F) -> Result<String>
where
    F: Fn(&SecretRef) -> Result<String>,
{
    let value = resolver(reference)?;
    if value.trim().is_empty() {
        return Err(ReleaseError::SecretUnavailable(format!(
            "{} が空です",
            reference
        )));
    }
    Ok(value)
}

/// プロセス環境からの解決
pub fn resolve_from_process(reference: &SecretRef) -> Result<String> {
    match reference {
        SecretRef::Env(name) => std::env::var(name).map_err(|_| {
            ReleaseError::SecretUnavailable(format!("環境変数 {} が設定されていません", name))
        }),
        SecretRef::OnePassword(reference) => onepassword::resolve_reference(reference),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
