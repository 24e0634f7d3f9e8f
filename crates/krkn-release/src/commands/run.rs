use super::TriggerArgs;
use crate::docker;
use crate::utils;
use colored::Colorize;
use krkn_release_core::{
    ReleaseOrchestrator, ReleasePlan, ReleaseSecrets, find_release_file, parse_release_file,
};
use std::path::Path;

pub async fn handle(
    config_path: Option<&Path>,
    trigger: &TriggerArgs,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    // 対象外のイベントでは設定も読まずに終了する
    let Some(trigger) = trigger.resolve()? else {
        if !json {
            println!(
                "{}",
                "リリース対象のイベントではありません。何もしません。".dimmed()
            );
        }
        return Ok(());
    };

    let path = find_release_file(config_path)?;
    let config = parse_release_file(&path)?;
    tracing::debug!(config = %path.display(), release = %config.name, "Loaded release configuration");
    let plan = ReleasePlan::new(&config, &trigger)?;

    if dry_run {
        if json {
            return utils::print_json(&plan);
        }
        utils::print_loaded_config(&path, &config);
        utils::print_plan(&plan);
        println!();
        println!("{}", "dry-run: ステップは実行されません".yellow());
        return Ok(());
    }

    if !json {
        utils::print_loaded_config(&path, &config);
        utils::print_plan(&plan);
    }

    // プルリクエストでは認証情報を一切読まない
    let secrets = if plan.requires_secrets() {
        Some(ReleaseSecrets::resolve(&config)?)
    } else {
        None
    };

    let docker = docker::init_docker_with_error_handling().await?;
    let orchestrator = ReleaseOrchestrator::new(krkn_release_build::collaborators(docker, &config));

    match orchestrator.execute(&plan, secrets.as_ref()).await {
        Ok(report) => {
            if json {
                utils::print_json(&report)?;
            } else {
                utils::print_report(&report);
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                utils::print_json(&failure.report)?;
            } else {
                utils::print_report(&failure.report);
            }
            Err(failure.into())
        }
    }
}
