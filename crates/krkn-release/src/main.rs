mod commands;
mod docker;
mod utils;

use clap::{Parser, Subcommand};
use commands::TriggerArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "krkn-release")]
#[command(about = "タグでリリース、PRでビルド。krkn イメージのリリースパイプライン", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// トリガーを判定してリリースを実行
    Run {
        /// release.kdl のパス（省略時は KRKN_RELEASE_CONFIG または上方向探索）
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        trigger: TriggerArgs,
        /// ステップを表示するだけで実行しない
        #[arg(long)]
        dry_run: bool,
        /// 結果を JSON で標準出力に書く
        #[arg(long)]
        json: bool,
    },
    /// 実行されるステップを表示
    Plan {
        /// release.kdl のパス
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        trigger: TriggerArgs,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// release.kdl を検証
    Validate {
        /// release.kdl のパス
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 標準出力は結果 (JSON を含む) に使うので、ログは stderr に出す
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            trigger,
            dry_run,
            json,
        } => {
            commands::run::handle(config.as_deref(), &trigger, dry_run, json).await?;
        }
        Commands::Plan {
            config,
            trigger,
            json,
        } => {
            commands::plan::handle(config.as_deref(), &trigger, json)?;
        }
        Commands::Validate { config } => {
            commands::validate::handle(config.as_deref())?;
        }
        Commands::Version => {
            println!("krkn-release {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
