//! krkn-release コア
//!
//! コンテナイメージのリリースを、トリガー（タグ push / プルリクエスト）に応じて
//! 組み立て・実行するためのモデルとオーケストレーター。
//!
//! # 概要
//!
//! - **設定**: `release.kdl` に2つのレジストリターゲットとビルド設定を書く
//! - **トリガー**: CLI 指定または CI 環境から [`TriggerContext`] を決める
//! - **プラン**: 設定とトリガーから [`ReleasePlan`] を作る
//! - **実行**: [`ReleaseOrchestrator`] がコラボレーターを順に呼び出す

pub mod collaborator;
pub mod discovery;
pub mod error;
pub mod model;
pub mod onepassword;
pub mod orchestrator;
pub mod parser;
pub mod plan;
pub mod secret;
pub mod trigger;

pub use collaborator::*;
pub use discovery::*;
pub use error::*;
pub use model::*;
pub use orchestrator::*;
pub use parser::*;
pub use plan::*;
pub use secret::*;
pub use trigger::*;
