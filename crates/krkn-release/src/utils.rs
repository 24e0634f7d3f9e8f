use colored::Colorize;
use krkn_release_core::{ReleaseConfig, ReleasePlan, ReleaseReport, StepStatus};
use std::path::Path;

/// 読み込んだ設定ファイルを表示
pub fn print_loaded_config(path: &Path, config: &ReleaseConfig) {
    println!("📄 読み込んだ設定ファイル:");
    println!("  • {}", path.display().to_string().cyan());
    println!(
        "  リリース: {} (イメージ: {})",
        config.name.cyan(),
        config.image
    );
}

/// プランのステップ一覧を表示
pub fn print_plan(plan: &ReleasePlan) {
    println!();
    println!("{} {}", "トリガー:".bold(), plan.trigger.to_string().cyan());
    println!("{}", "ステップ:".bold());
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, step);
    }
}

/// 実行結果を表示
pub fn print_report(report: &ReleaseReport) {
    println!();
    for record in &report.steps {
        let marker = status_marker(&record.status);
        match &record.status {
            StepStatus::Failed(message) => {
                println!("  {} {}", marker, record.step);
                for line in message.lines() {
                    println!("      {}", line.red());
                }
            }
            _ => println!(
                "  {} {} {}",
                marker,
                record.step,
                format_elapsed(record.elapsed_ms).dimmed()
            ),
        }
    }

    println!();
    if report.succeeded() {
        println!("{}", "✓ リリースが完了しました".green().bold());
    } else {
        println!("{}", "✗ リリースに失敗しました".red().bold());
    }

    if !report.pushed.is_empty() {
        println!("プッシュ済み:");
        for reference in &report.pushed {
            println!("  • {}", reference.cyan());
        }
    }
}

/// JSON を標準出力へ
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_marker(status: &StepStatus) -> String {
    match status {
        StepStatus::Succeeded => "✓".green().to_string(),
        StepStatus::Failed(_) => "✗".red().to_string(),
        StepStatus::Skipped => "-".dimmed().to_string(),
    }
}

/// 経過時間を短く整形
pub fn format_elapsed(elapsed_ms: u64) -> String {
    if elapsed_ms < 1_000 {
        format!("({}ms)", elapsed_ms)
    } else if elapsed_ms < 60_000 {
        format!("({:.1}s)", elapsed_ms as f64 / 1_000.0)
    } else {
        format!("({}m{:02}s)", elapsed_ms / 60_000, (elapsed_ms % 60_000) / 1_000)
    }
}
