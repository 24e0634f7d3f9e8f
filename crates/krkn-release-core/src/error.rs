use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "release.kdl が見つかりません\n探索開始位置: {0}\nヒント: --config または KRKN_RELEASE_CONFIG で指定してください"
    )]
    ConfigNotFound(PathBuf),

    #[error("不正なリリース定義: {0}")]
    InvalidConfig(String),

    #[error("バージョンタグが不正です: {0} (vMAJOR.MINOR.PATCH 形式が必要です)")]
    InvalidVersionTag(String),

    #[error("シークレットを取得できません: {0}")]
    SecretUnavailable(String),

    #[error("1Passwordエラー: {0}")]
    OnePasswordError(String),

    #[error("イベントペイロードの読み込みに失敗: {path}\n理由: {message}")]
    EventPayload { path: PathBuf, message: String },

    #[error("チェックアウトに失敗しました: {0}")]
    Checkout(String),

    #[error("Dockerfile の生成に失敗しました: {0}")]
    Materialize(String),

    #[error("イメージのビルドに失敗しました: {0}")]
    Build(String),

    #[error("タグ付けに失敗しました: {reference}\n理由: {message}")]
    Tag { reference: String, message: String },

    #[error("レジストリ認証に失敗しました: {target} ({registry})\n理由: {message}")]
    Login {
        target: String,
        registry: String,
        message: String,
    },

    #[error("プッシュに失敗しました: {reference}\n理由: {message}")]
    Push { reference: String, message: String },

    #[error("{reference} のプッシュには {expected} のログインが必要です (現在: {actual})")]
    SessionMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("下流リビルドのトリガーに失敗しました: {0}")]
    Downstream(String),
}

pub type Result<T> = std::result::Result<T, ReleaseError>;
