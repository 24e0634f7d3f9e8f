#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::{RELEASE_KDL, TestProject};
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("krkn-release").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("タグでリリース"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("validate"));
}

/// バージョン表示
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("krkn-release").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("krkn-release"));
}

/// runコマンドのヘルプにトリガー指定が並ぶ
#[test]
fn test_run_help() {
    let mut cmd = Command::cargo_bin("krkn-release").unwrap();
    cmd.arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("--pr"))
        .stdout(predicate::str::contains("--ref"))
        .stdout(predicate::str::contains("--dry-run"));
}

/// トリガーがなければ設定ファイルなしでも成功して何もしない
#[test]
fn test_run_without_trigger_is_noop() {
    let project = TestProject::new();
    project
        .command()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("何もしません"));
}

/// ブランチへの push は対象外
#[test]
fn test_run_branch_push_is_noop() {
    let project = TestProject::new();
    project
        .command()
        .arg("run")
        .env("GITHUB_EVENT_NAME", "push")
        .env("GITHUB_REF", "refs/heads/main")
        .assert()
        .success()
        .stdout(predicate::str::contains("何もしません"));
}

/// 対象外のイベントではペイロードが読めなくても成功する
#[test]
fn test_run_unrelated_event_ignores_unreadable_payload() {
    let project = TestProject::new();
    project
        .command()
        .arg("run")
        .env("GITHUB_EVENT_NAME", "schedule")
        .env("GITHUB_REF", "refs/heads/main")
        .env("GITHUB_EVENT_PATH", "/nonexistent/event.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("何もしません"));
}

/// バージョン形式でないタグ ref も対象外
#[test]
fn test_run_non_version_tag_ref_is_noop() {
    let project = TestProject::new();
    project
        .command()
        .args(["run", "--ref", "refs/tags/nightly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("何もしません"));
}

/// 明示した --tag が不正ならエラー
#[test]
fn test_run_invalid_tag_fails() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["run", "--tag", "v2.4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("バージョンタグが不正です"));
}

/// トリガー指定は1つだけ
#[test]
fn test_trigger_flags_conflict() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["plan", "--tag", "v1.0.0", "--pr", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

/// タグ push のプランは4つのタグと4つのプッシュを含む
#[test]
fn test_plan_tag_push() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["plan", "--tag", "v2.4.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--build-arg TAG=v2.4.0"))
        .stdout(predicate::str::contains(
            "tag quay.io/krkn-chaos/krkn -> quay.io/redhat-chaos/krkn:v2.4.0",
        ))
        .stdout(predicate::str::contains("login target1 (krkn-chaos @ quay.io)"))
        .stdout(predicate::str::contains(
            "push quay.io/redhat-chaos/krkn:v2.4.0 (target2)",
        ))
        .stdout(predicate::str::contains("trigger-downstream bash"));
}

/// プルリクエストのプランはビルドのみ
#[test]
fn test_plan_pull_request() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["plan", "--pr", "137"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--build-arg PR_NUMBER=137"))
        .stdout(predicate::str::contains("push").not())
        .stdout(predicate::str::contains("login").not());
}

/// CI のプルリクエストイベントからPR番号を読む
#[test]
fn test_plan_pull_request_from_event_payload() {
    let project = TestProject::with_release(RELEASE_KDL);
    let payload = project.write_file("event.json", r#"{"pull_request": {"number": 58}}"#);

    project
        .command()
        .arg("plan")
        .env("GITHUB_EVENT_NAME", "pull_request")
        .env("GITHUB_REF", "refs/pull/58/merge")
        .env("GITHUB_EVENT_PATH", &payload)
        .assert()
        .success()
        .stdout(predicate::str::contains("pull request #58"))
        .stdout(predicate::str::contains("PR_NUMBER=58"));
}

/// JSON のプランにはシークレットの参照先も値も含まれない
#[test]
fn test_plan_json() {
    let project = TestProject::with_release(RELEASE_KDL);
    let output = project
        .command()
        .args(["plan", "--tag", "v2.4.0", "--json"])
        .env("QUAY_TOKEN_1", "super-secret-token")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(plan["trigger"]["tag_push"], "v2.4.0");
    assert_eq!(plan["steps"].as_array().unwrap().len(), 14);
    assert!(!stdout.contains("super-secret-token"));
    assert!(!stdout.contains("QUAY_TOKEN_1"));
}

/// dry-run は認証情報も Docker も不要
#[test]
fn test_run_dry_run() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["run", "--tag", "v2.4.0", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"))
        .stdout(predicate::str::contains("push quay.io/krkn-chaos/krkn:v2.4.0"));
}

/// タグ push で認証情報がなければ何も実行せずに失敗
#[test]
fn test_run_tag_push_without_secrets_fails() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .args(["run", "--tag", "v2.4.0"])
        .env_remove("QUAY_USER_1")
        .env_remove("QUAY_TOKEN_1")
        .env_remove("QUAY_USER_2")
        .env_remove("QUAY_TOKEN_2")
        .env_remove("AUTOPUSH")
        .assert()
        .failure()
        .stderr(predicate::str::contains("シークレットを取得できません"));
}

/// release.kdl がなければエラー
#[test]
fn test_run_without_config_fails() {
    let project = TestProject::new();
    project
        .command()
        .args(["run", "--tag", "v1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("release.kdl が見つかりません"));
}

/// --config で明示したファイルを使う
#[test]
fn test_plan_with_explicit_config() {
    let project = TestProject::new();
    let path = project.write_file("custom.kdl", RELEASE_KDL);

    project
        .command()
        .arg("plan")
        .arg("--config")
        .arg(&path)
        .args(["--pr", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.kdl"));
}

/// validate は2つのターゲットを表示する
#[test]
fn test_validate() {
    let project = TestProject::with_release(RELEASE_KDL);
    project
        .command()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("設定ファイルは正常です"))
        .stdout(predicate::str::contains("quay.io/krkn-chaos/krkn"))
        .stdout(predicate::str::contains("quay.io/redhat-chaos/krkn"))
        .stdout(predicate::str::contains("env:QUAY_TOKEN_2"));
}

/// ターゲットが1つしかない設定は不正
#[test]
fn test_validate_single_target_fails() {
    let project = TestProject::with_release(
        r#"
release "krkn"
image "krkn"
target "krkn-chaos" {
    registry "quay.io"
    username "env:U"
    token "env:T"
}
"#,
    );
    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定エラー"));
}
