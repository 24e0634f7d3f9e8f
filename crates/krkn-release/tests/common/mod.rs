#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const RELEASE_KDL: &str = r#"
release "krkn"
image "krkn"

build {
    context "containers"
}

target "krkn-chaos" {
    registry "quay.io"
    namespace "quay.io/krkn-chaos"
    username "env:QUAY_USER_1"
    token "env:QUAY_TOKEN_1"
}

target "redhat-chaos" {
    registry "quay.io"
    username "env:QUAY_USER_2"
    token "env:QUAY_TOKEN_2"
}

downstream {
    command "bash" "scripts/trigger-downstream.sh"
    autopush "env:AUTOPUSH"
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_release(content: &str) -> Self {
        let project = Self::new();
        project.write_release_kdl(content);
        project
    }

    pub fn write_release_kdl(&self, content: &str) {
        fs::write(self.root.path().join("release.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// CI 環境変数を消した状態のコマンド
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("krkn-release").unwrap();
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env_remove("KRKN_RELEASE_CONFIG")
            .env_remove("GITHUB_EVENT_NAME")
            .env_remove("GITHUB_REF")
            .env_remove("GITHUB_EVENT_PATH")
            .env_remove("RUST_LOG");
        cmd
    }
}
