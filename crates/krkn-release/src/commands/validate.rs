use colored::Colorize;
use krkn_release_core::{TargetSlot, find_release_file, parse_release_file};
use std::path::Path;

pub fn handle(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let path = match find_release_file(config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ release.kdl が見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let config = match parse_release_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  リリース: {}", config.name.cyan());
    println!("  イメージ: {}", config.image);
    println!(
        "  ワークツリー: {}",
        match &config.checkout.repository {
            Some(repo) => format!("{} (clone)", repo),
            None => config.working_tree().display().to_string(),
        }
    );
    println!("  ビルドスクリプト: {}", config.build.script.display());

    println!("  ターゲット:");
    for slot in [TargetSlot::Primary, TargetSlot::Secondary] {
        let target = config.target(slot);
        println!(
            "    - {} {} ({})",
            slot.to_string().dimmed(),
            target.name.cyan(),
            target.unversioned(&config.image)
        );
        println!("      username: {}  token: {}", target.username, target.token);
    }

    match &config.downstream {
        Some(downstream) => {
            println!("  下流トリガー: {}", downstream.command.join(" "));
            println!("      autopush: {}", downstream.autopush);
        }
        None => {
            println!(
                "  下流トリガー: {}",
                "(未設定: タグ push は実行できません)".yellow()
            );
        }
    }

    Ok(())
}
