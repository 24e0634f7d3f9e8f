pub mod plan;
pub mod run;
pub mod validate;

use clap::Args;
use krkn_release_core::{CiEnvironment, TriggerContext, TriggerOverride, resolve_trigger};

/// トリガーの明示指定（いずれか1つ）
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct TriggerArgs {
    /// リリースするバージョンタグ (例: v2.4.0)
    #[arg(long)]
    pub tag: Option<String>,

    /// ビルドするプルリクエスト番号
    #[arg(long)]
    pub pr: Option<u64>,

    /// git ref (例: refs/tags/v2.4.0, refs/pull/137/merge)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,
}

impl TriggerArgs {
    pub fn to_override(&self) -> Option<TriggerOverride> {
        if let Some(tag) = &self.tag {
            Some(TriggerOverride::Tag(tag.clone()))
        } else if let Some(number) = self.pr {
            Some(TriggerOverride::PullRequest(number))
        } else {
            self.git_ref.clone().map(TriggerOverride::Ref)
        }
    }

    /// 明示指定、なければ CI 環境からトリガーを決定
    pub fn resolve(&self) -> anyhow::Result<Option<TriggerContext>> {
        let explicit = self.to_override();
        let ci = match explicit {
            Some(_) => CiEnvironment::default(),
            None => CiEnvironment::from_env()?,
        };
        Ok(resolve_trigger(explicit.as_ref(), &ci)?)
    }
}
