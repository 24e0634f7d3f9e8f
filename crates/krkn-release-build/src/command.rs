//! 外部コマンドの実行

use crate::error::{BuildError, BuildResult};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// コマンドを実行して stdout を返す
pub async fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> BuildResult<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!("Running: {} {}", program, args.join(" "));

    let output = cmd.output().await.map_err(|e| BuildError::CommandFailed {
        command: program.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            message: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// `input` を stdin に流し込んでコマンドを実行する
///
/// 認証情報を扱うため、引数はログにもエラーにも含めない。
pub async fn run_command_with_stdin(
    program: &str,
    args: &[&str],
    input: &str,
    cwd: Option<&Path>,
) -> BuildResult<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!("Running: {} (stdin)", program);

    let failed = |message: String| BuildError::CommandFailed {
        command: program.to_string(),
        message,
    };

    let mut child = cmd.spawn().map_err(|e| failed(e.to_string()))?;
    if let Some(mut stdin) = child.stdin.take() {
        // stdin を読まずに終了したプロセスは終了コードで判定する
        match stdin.write_all(input.as_bytes()).await {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(failed(e.to_string()));
            }
            _ => {}
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        return Err(failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
