use super::TriggerArgs;
use crate::utils;
use colored::Colorize;
use krkn_release_core::{ReleasePlan, find_release_file, parse_release_file};
use std::path::Path;

pub fn handle(config_path: Option<&Path>, trigger: &TriggerArgs, json: bool) -> anyhow::Result<()> {
    let Some(trigger) = trigger.resolve()? else {
        if !json {
            println!(
                "{}",
                "リリース対象のイベントではありません。ステップはありません。".dimmed()
            );
        }
        return Ok(());
    };

    let path = find_release_file(config_path)?;
    let config = parse_release_file(&path)?;
    let plan = ReleasePlan::new(&config, &trigger)?;

    if json {
        return utils::print_json(&plan);
    }

    utils::print_loaded_config(&path, &config);
    utils::print_plan(&plan);
    Ok(())
}
