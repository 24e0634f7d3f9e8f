//! レジストリ認証処理
//!
//! `docker login` でターゲットごとにログインし、
//! そのターゲット専用の [`RegistrySession`] を返します。
//! トークンは子プロセスの stdin にだけ渡し、引数には載せません。

use crate::command::run_command_with_stdin;
use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use krkn_release_core::{CredentialPair, LoginRegistry, RegistrySession, ReleaseError, TargetSlot};

pub struct DockerRegistryLogin {
    command: Vec<String>,
}

impl DockerRegistryLogin {
    pub fn new() -> Self {
        Self::with_command(vec!["docker".to_string()])
    }

    /// `docker` の代わりに使うコマンド (先頭がプログラム)
    pub fn with_command(command: Vec<String>) -> Self {
        Self { command }
    }

    /// `<command> login <registry> --username <user> --password-stdin`
    pub async fn docker_login(
        &self,
        registry: &str,
        credentials: &CredentialPair,
    ) -> BuildResult<()> {
        let (program, prefix) =
            self.command
                .split_first()
                .ok_or_else(|| BuildError::AuthFailed {
                    registry: registry.to_string(),
                    message: "ログインコマンドが空です".to_string(),
                })?;

        let mut args: Vec<&str> = prefix.iter().map(String::as_str).collect();
        args.extend([
            "login",
            registry,
            "--username",
            credentials.username.expose().as_str(),
            "--password-stdin",
        ]);

        run_command_with_stdin(program, &args, credentials.token.expose(), None)
            .await
            .map_err(|e| BuildError::AuthFailed {
                registry: registry.to_string(),
                message: match e {
                    BuildError::CommandFailed { message, .. } => message,
                    other => other.to_string(),
                },
            })?;

        Ok(())
    }
}

impl Default for DockerRegistryLogin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoginRegistry for DockerRegistryLogin {
    async fn login(
        &self,
        target: TargetSlot,
        registry: &str,
        credentials: &CredentialPair,
    ) -> krkn_release_core::Result<RegistrySession> {
        self.docker_login(registry, credentials)
            .await
            .map_err(|e| ReleaseError::Login {
                target: target.to_string(),
                registry: registry.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!("Logged in to {} as {}", registry, target);
        Ok(RegistrySession::new(target, registry, credentials.clone()))
    }
}

/// セッションの認証情報を Bollard の形式へ
pub fn docker_credentials(registry: &str, credentials: &CredentialPair) -> DockerCredentials {
    DockerCredentials {
        username: Some(credentials.username.expose().clone()),
        password: Some(credentials.token.expose().clone()),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_docker_credentials_are_bound_to_registry() {
        let pair = CredentialPair::new("krkn-bot", "token-one");
        let creds = docker_credentials("quay.io", &pair);

        assert_eq!(creds.username.as_deref(), Some("krkn-bot"));
        assert_eq!(creds.password.as_deref(), Some("token-one"));
        assert_eq!(creds.serveraddress.as_deref(), Some("quay.io"));
    }

    #[tokio::test]
    async fn test_login_passes_token_on_stdin_only() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fake-docker.sh");
        fs::write(
            &script,
            "dir=$(dirname \"$0\")\ncat > \"$dir/stdin.txt\"\necho \"$@\" > \"$dir/args.txt\"\n",
        )
        .unwrap();

        let login = DockerRegistryLogin::with_command(vec![
            "sh".to_string(),
            script.to_string_lossy().to_string(),
        ]);
        let session = login
            .login(
                TargetSlot::Secondary,
                "quay.io",
                &CredentialPair::new("redhat-bot", "token-two"),
            )
            .await
            .unwrap();

        assert_eq!(session.target(), TargetSlot::Secondary);
        assert_eq!(session.registry(), "quay.io");

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            "login quay.io --username redhat-bot --password-stdin"
        );
        assert!(!args.contains("token-two"));
        assert_eq!(
            fs::read_to_string(dir.path().join("stdin.txt")).unwrap(),
            "token-two"
        );
    }

    #[tokio::test]
    async fn test_failed_login_is_login_error_without_token() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fake-docker.sh");
        fs::write(
            &script,
            "cat > /dev/null\necho 'unauthorized: incorrect username or password' >&2\nexit 1\n",
        )
        .unwrap();

        let login = DockerRegistryLogin::with_command(vec![
            "sh".to_string(),
            script.to_string_lossy().to_string(),
        ]);
        let err = login
            .login(
                TargetSlot::Primary,
                "quay.io",
                &CredentialPair::new("krkn-bot", "token-one"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::Login { .. }));
        let message = err.to_string();
        assert!(message.contains("unauthorized"));
        assert!(!message.contains("token-one"));
    }

    #[tokio::test]
    async fn test_login_with_missing_program_fails() {
        let login =
            DockerRegistryLogin::with_command(vec!["krkn-release-no-such-docker".to_string()]);
        let result = login
            .login(
                TargetSlot::Primary,
                "quay.io",
                &CredentialPair::new("krkn-bot", "token-one"),
            )
            .await;
        assert!(matches!(result, Err(ReleaseError::Login { .. })));
    }
}
