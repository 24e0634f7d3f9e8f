//! `op://` 参照を `op read` で解決する
//!
//! 読み出した値はログにもエラーにも載せない。

use crate::error::{ReleaseError, Result};
use std::process::Command;
use tracing::debug;

pub const PREFIX: &str = "op://";

/// `op read <reference>` の結果を返す
///
/// `OP_ACCOUNT` があればそのアカウントで読む。
pub fn resolve_reference(reference: &str) -> Result<String> {
    if !reference.starts_with(PREFIX) {
        return Err(ReleaseError::OnePasswordError(format!(
            "{} で始まらない参照です: {}",
            PREFIX, reference
        )));
    }

    debug!(reference = %reference, "op read");

    let mut cmd = Command::new("op");
    cmd.args(["read", "--no-newline", reference]);
    if let Ok(account) = std::env::var("OP_ACCOUNT") {
        cmd.args(["--account", &account]);
    }

    let output = cmd.output().map_err(|e| {
        ReleaseError::OnePasswordError(format!("op を起動できません ({}): {}", reference, e))
    })?;

    if !output.status.success() {
        return Err(ReleaseError::OnePasswordError(format!(
            "{}: {}",
            reference,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
