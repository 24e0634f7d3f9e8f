//! release.kdl の発見ロジック
//!
//! 明示パス → 環境変数 → 上方向探索の順で探す。

use crate::error::{ReleaseError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 設定ファイル名
pub const RELEASE_FILENAME: &str = "release.kdl";

/// 設定ファイルパスの環境変数
pub const RELEASE_CONFIG_ENV: &str = "KRKN_RELEASE_CONFIG";

/// release.kdl を発見する
///
/// 検索順序:
/// 1. 明示指定されたパス（--config）
/// 2. KRKN_RELEASE_CONFIG 環境変数
/// 3. カレントディレクトリから上方向探索
#[tracing::instrument]
pub fn find_release_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ReleaseError::ConfigNotFound(path.to_path_buf()));
    }

    if let Ok(path_str) = std::env::var(RELEASE_CONFIG_ENV) {
        let path = PathBuf::from(&path_str);
        debug!(env_path = %path_str, "Checking {}", RELEASE_CONFIG_ENV);
        if path.is_file() {
            info!(release_path = %path.display(), "Found release file from environment variable");
            return Ok(path);
        }
        warn!(env_path = %path_str, "{} is set but file does not exist", RELEASE_CONFIG_ENV);
    }

    let start_dir = std::env::current_dir()?;
    find_release_file_from(&start_dir).ok_or(ReleaseError::ConfigNotFound(start_dir))
}

/// 指定ディレクトリから上方向に release.kdl を探す
pub fn find_release_file_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for {}", RELEASE_FILENAME);

    loop {
        let release_file = current.join(RELEASE_FILENAME);
        if release_file.is_file() {
            info!(release_path = %release_file.display(), "Found release file");
            return Some(release_file);
        }

        if !current.pop() {
            break;
        }
    }

    debug!("Release file not found");
    None
}
