//! release.kdl パーサー
//!
//! KDL構文をパースして [`ReleaseConfig`] を生成する。

use crate::error::{ReleaseError, Result};
use crate::model::{
    BuildSettings, CheckoutSettings, DownstreamSettings, RegistryTarget, ReleaseConfig,
};
use crate::secret::SecretRef;
use kdl::{KdlDocument, KdlNode};
use std::path::{Path, PathBuf};

/// KDLファイルを ReleaseConfig にパース
///
/// 相対パスはファイルのあるディレクトリを基準に解決される。
pub fn parse_release_file(path: &Path) -> Result<ReleaseConfig> {
    let content = std::fs::read_to_string(path)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    parse_release(&content, root)
}

/// KDL文字列を ReleaseConfig にパース
pub fn parse_release(content: &str, root: PathBuf) -> Result<ReleaseConfig> {
    let doc: KdlDocument = content.parse()?;

    let mut name = None;
    let mut image = None;
    let mut checkout = CheckoutSettings::default();
    let mut build = BuildSettings::default();
    let mut targets = Vec::new();
    let mut downstream = None;

    for node in doc.nodes() {
        match node.name().value() {
            "release" => name = first_string(node),
            "image" => image = first_string(node),
            "checkout" => checkout = parse_checkout(node),
            "build" => build = parse_build(node),
            "target" => targets.push(parse_target(node)?),
            "downstream" => downstream = Some(parse_downstream(node)?),
            _ => {
                // 不明なノードはスキップ
            }
        }
    }

    let name = name
        .ok_or_else(|| ReleaseError::InvalidConfig("release ノードが必要です".to_string()))?;
    let image =
        image.ok_or_else(|| ReleaseError::InvalidConfig("image ノードが必要です".to_string()))?;

    let targets: [RegistryTarget; 2] = targets.try_into().map_err(|found: Vec<_>| {
        ReleaseError::InvalidConfig(format!(
            "target はちょうど2つ必要です (定義数: {})",
            found.len()
        ))
    })?;

    if targets[0].name == targets[1].name {
        return Err(ReleaseError::InvalidConfig(format!(
            "target 名が重複しています: {}",
            targets[0].name
        )));
    }

    Ok(ReleaseConfig {
        name,
        image,
        root,
        checkout,
        build,
        targets,
        downstream,
    })
}

/// checkout ノードをパース
fn parse_checkout(node: &KdlNode) -> CheckoutSettings {
    let mut checkout = CheckoutSettings::default();

    for child in children(node) {
        match child.name().value() {
            "repository" => checkout.repository = first_string(child),
            "path" => {
                if let Some(path) = first_string(child) {
                    checkout.path = PathBuf::from(path);
                }
            }
            _ => {}
        }
    }

    checkout
}

/// build ノードをパース
///
/// dockerfile と script は context を基準にデフォルト値が決まる。
fn parse_build(node: &KdlNode) -> BuildSettings {
    let context = children(node)
        .find(|child| child.name().value() == "context")
        .and_then(first_string)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut build = BuildSettings::with_context(context);

    for child in children(node) {
        match child.name().value() {
            "dockerfile" => {
                if let Some(path) = first_string(child) {
                    build.dockerfile = PathBuf::from(path);
                }
            }
            "script" => {
                if let Some(path) = first_string(child) {
                    build.script = PathBuf::from(path);
                }
            }
            _ => {}
        }
    }

    build
}

/// target ノードをパース
fn parse_target(node: &KdlNode) -> Result<RegistryTarget> {
    let name = first_string(node)
        .ok_or_else(|| ReleaseError::InvalidConfig("target には名前が必要です".to_string()))?;

    let mut registry = None;
    let mut namespace = None;
    let mut username = None;
    let mut token = None;

    for child in children(node) {
        match child.name().value() {
            "registry" => registry = first_string(child),
            "namespace" => namespace = first_string(child),
            "username" => username = first_string(child).map(|s| SecretRef::parse(&s)),
            "token" => token = first_string(child).map(|s| SecretRef::parse(&s)),
            _ => {}
        }
    }

    let registry = registry.ok_or_else(|| {
        ReleaseError::InvalidConfig(format!("target '{}' に registry が必要です", name))
    })?;
    let username = username.ok_or_else(|| {
        ReleaseError::InvalidConfig(format!("target '{}' に username が必要です", name))
    })?;
    let token = token.ok_or_else(|| {
        ReleaseError::InvalidConfig(format!("target '{}' に token が必要です", name))
    })?;
    let namespace = namespace.unwrap_or_else(|| format!("{}/{}", registry, name));

    if namespace.split('/').next() != Some(registry.as_str()) {
        return Err(ReleaseError::InvalidConfig(format!(
            "target '{}' の namespace '{}' が registry '{}' で始まっていません",
            name, namespace, registry
        )));
    }

    Ok(RegistryTarget {
        name,
        registry,
        namespace,
        username,
        token,
    })
}

/// downstream ノードをパース
fn parse_downstream(node: &KdlNode) -> Result<DownstreamSettings> {
    let mut command = Vec::new();
    let mut autopush = None;

    for child in children(node) {
        match child.name().value() {
            "command" => command = strings(child),
            "autopush" => autopush = first_string(child).map(|s| SecretRef::parse(&s)),
            _ => {}
        }
    }

    if command.is_empty() {
        return Err(ReleaseError::InvalidConfig(
            "downstream に command が必要です".to_string(),
        ));
    }
    let autopush = autopush.ok_or_else(|| {
        ReleaseError::InvalidConfig("downstream に autopush が必要です".to_string())
    })?;

    Ok(DownstreamSettings { command, autopush })
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes())
}

/// 最初の位置引数（文字列）
fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .find_map(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 文字列の位置引数すべて
fn strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetSlot;

    const SAMPLE_RELEASE: &str = r#"
release "krkn"
image "krkn"

checkout {
    repository "https://github.com/krkn-chaos/krkn.git"
    path "src"
}

build {
    context "containers"
    script "containers/compile_dockerfile.sh"
}

target "krkn-chaos" {
    registry "quay.io"
    namespace "quay.io/krkn-chaos"
    username "env:QUAY_USER_1"
    token "env:QUAY_TOKEN_1"
}

target "redhat-chaos" {
    registry "quay.io"
    username "QUAY_USER_2"
    token "op://CI/quay-redhat-chaos/token"
}

downstream {
    command "bash" "scripts/trigger-downstream.sh"
    autopush "env:AUTOPUSH"
}
"#;

    fn minimal(targets: &str) -> String {
        format!("release \"krkn\"\nimage \"krkn\"\n{}", targets)
    }

    const TARGET_A: &str = r#"
target "a" {
    registry "quay.io"
    username "U1"
    token "T1"
}
"#;

    const TARGET_B: &str = r#"
target "b" {
    registry "quay.io"
    username "U2"
    token "T2"
}
"#;

    #[test]
    fn test_parse_release_full() {
        let config = parse_release(SAMPLE_RELEASE, PathBuf::from("/work")).unwrap();

        assert_eq!(config.name, "krkn");
        assert_eq!(config.image, "krkn");
        assert_eq!(config.root, PathBuf::from("/work"));

        assert_eq!(
            config.checkout.repository.as_deref(),
            Some("https://github.com/krkn-chaos/krkn.git")
        );
        assert_eq!(config.working_tree(), PathBuf::from("/work/src"));

        assert_eq!(config.build.context, PathBuf::from("containers"));
        assert_eq!(config.build.dockerfile, PathBuf::from("containers/Dockerfile"));
        assert_eq!(
            config.build.script,
            PathBuf::from("containers/compile_dockerfile.sh")
        );

        let primary = config.target(TargetSlot::Primary);
        assert_eq!(primary.name, "krkn-chaos");
        assert_eq!(primary.namespace, "quay.io/krkn-chaos");
        assert_eq!(primary.username, SecretRef::Env("QUAY_USER_1".to_string()));

        let secondary = config.target(TargetSlot::Secondary);
        assert_eq!(secondary.name, "redhat-chaos");
        assert_eq!(secondary.namespace, "quay.io/redhat-chaos");
        assert_eq!(secondary.username, SecretRef::Env("QUAY_USER_2".to_string()));
        assert_eq!(
            secondary.token,
            SecretRef::OnePassword("op://CI/quay-redhat-chaos/token".to_string())
        );

        let downstream = config.downstream.unwrap();
        assert_eq!(
            downstream.command,
            vec!["bash".to_string(), "scripts/trigger-downstream.sh".to_string()]
        );
        assert_eq!(downstream.autopush, SecretRef::Env("AUTOPUSH".to_string()));
    }

    #[test]
    fn test_parse_release_defaults() {
        let content = minimal(&format!("{}{}", TARGET_A, TARGET_B));
        let config = parse_release(&content, PathBuf::from(".")).unwrap();

        assert_eq!(config.checkout, CheckoutSettings::default());
        assert_eq!(config.build, BuildSettings::default());
        assert!(config.downstream.is_none());
    }

    #[test]
    fn test_parse_release_requires_two_targets() {
        let one = parse_release(&minimal(TARGET_A), PathBuf::from("."));
        assert!(matches!(one, Err(ReleaseError::InvalidConfig(_))));

        let three = parse_release(
            &minimal(&format!("{}{}{}", TARGET_A, TARGET_B, TARGET_A)),
            PathBuf::from("."),
        );
        assert!(matches!(three, Err(ReleaseError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_release_duplicate_targets() {
        let result = parse_release(&minimal(&format!("{}{}", TARGET_A, TARGET_A)), PathBuf::from("."));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("重複"));
    }

    #[test]
    fn test_parse_release_requires_name_and_image() {
        let content = format!("image \"krkn\"\n{}{}", TARGET_A, TARGET_B);
        assert!(parse_release(&content, PathBuf::from(".")).is_err());

        let content = format!("release \"krkn\"\n{}{}", TARGET_A, TARGET_B);
        assert!(parse_release(&content, PathBuf::from(".")).is_err());
    }

    #[test]
    fn test_parse_target_requires_credentials() {
        let content = minimal(
            r#"
target "a" {
    registry "quay.io"
    username "U1"
}
"#,
        );
        let err = parse_release(&format!("{}{}", content, TARGET_B), PathBuf::from(".")).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_parse_target_namespace_must_match_registry() {
        let content = minimal(
            r#"
target "a" {
    registry "quay.io"
    namespace "docker.io/a"
    username "U1"
    token "T1"
}
"#,
        );
        let result = parse_release(&format!("{}{}", content, TARGET_B), PathBuf::from("."));
        assert!(matches!(result, Err(ReleaseError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_downstream_requires_command() {
        let content = minimal(&format!(
            "{}{}downstream {{\n    autopush \"AUTOPUSH\"\n}}\n",
            TARGET_A, TARGET_B
        ));
        let result = parse_release(&content, PathBuf::from("."));
        assert!(matches!(result, Err(ReleaseError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_release_invalid_kdl() {
        let result = parse_release("release {", PathBuf::from("."));
        assert!(matches!(result, Err(ReleaseError::KdlParse(_))));
    }

    #[test]
    fn test_parse_release_file_uses_parent_as_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("release.kdl");
        std::fs::write(&path, SAMPLE_RELEASE).unwrap();

        let config = parse_release_file(&path).unwrap();
        assert_eq!(config.root, temp_dir.path());
    }
}
