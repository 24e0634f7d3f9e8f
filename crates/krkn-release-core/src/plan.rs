//! リリースプラン
//!
//! 設定とトリガーから、実行するステップの並びを決定する。
//! プランにはシークレットの値を含めない。

use crate::error::{ReleaseError, Result};
use crate::model::{ImageReference, ReleaseConfig, TargetSlot};
use crate::trigger::TriggerContext;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// タグ push 時のビルド引数
pub const TAG_BUILD_ARG: &str = "TAG";

/// プルリクエスト時のビルド引数
pub const PR_BUILD_ARG: &str = "PR_NUMBER";

/// 1ステップ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Checkout {
        path: PathBuf,
        repository: Option<String>,
    },
    MaterializeDockerfile {
        script: PathBuf,
    },
    Build {
        context: PathBuf,
        dockerfile: PathBuf,
        image: ImageReference,
        build_args: BTreeMap<String, String>,
        no_cache: bool,
    },
    Tag {
        source: ImageReference,
        destination: ImageReference,
    },
    Login {
        target: TargetSlot,
        name: String,
        registry: String,
    },
    Push {
        target: TargetSlot,
        reference: ImageReference,
    },
    TriggerDownstream {
        command: Vec<String>,
    },
}

/// ステップの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Checkout,
    MaterializeDockerfile,
    Build,
    Tag,
    Login,
    Push,
    TriggerDownstream,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Checkout => "checkout",
            StepKind::MaterializeDockerfile => "materialize-dockerfile",
            StepKind::Build => "build",
            StepKind::Tag => "tag",
            StepKind::Login => "login",
            StepKind::Push => "push",
            StepKind::TriggerDownstream => "trigger-downstream",
        };
        f.write_str(name)
    }
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Checkout { .. } => StepKind::Checkout,
            Step::MaterializeDockerfile { .. } => StepKind::MaterializeDockerfile,
            Step::Build { .. } => StepKind::Build,
            Step::Tag { .. } => StepKind::Tag,
            Step::Login { .. } => StepKind::Login,
            Step::Push { .. } => StepKind::Push,
            Step::TriggerDownstream { .. } => StepKind::TriggerDownstream,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Checkout { path, repository } => match repository {
                Some(repo) => write!(f, "checkout {} -> {}", repo, path.display()),
                None => write!(f, "checkout {}", path.display()),
            },
            Step::MaterializeDockerfile { script } => {
                write!(f, "materialize-dockerfile {}", script.display())
            }
            Step::Build {
                context,
                image,
                build_args,
                ..
            } => {
                write!(f, "build {} from {}", image, context.display())?;
                for (key, value) in build_args {
                    write!(f, " --build-arg {}={}", key, value)?;
                }
                Ok(())
            }
            Step::Tag {
                source,
                destination,
            } => write!(f, "tag {} -> {}", source, destination),
            Step::Login {
                target,
                name,
                registry,
            } => write!(f, "login {} ({} @ {})", target, name, registry),
            Step::Push { target, reference } => write!(f, "push {} ({})", reference, target),
            Step::TriggerDownstream { command } => {
                write!(f, "trigger-downstream {}", command.join(" "))
            }
        }
    }
}

/// 実行順に並んだステップ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub trigger: TriggerContext,
    pub steps: Vec<Step>,
}

impl ReleasePlan {
    /// トリガーに応じたステップ列を組み立てる
    ///
    /// - タグ push: build → tag×4 → login(target1) → push×2 → login(target2) → push×2 → trigger
    /// - プルリクエスト: build のみ
    pub fn new(config: &ReleaseConfig, trigger: &TriggerContext) -> Result<Self> {
        let mut steps = vec![
            Step::Checkout {
                path: config.checkout.path.clone(),
                repository: config.checkout.repository.clone(),
            },
            Step::MaterializeDockerfile {
                script: config.build.script.clone(),
            },
        ];

        let build_image = config.build_reference();
        let build_step = |key: &str, value: String| Step::Build {
            context: config.build.context.clone(),
            dockerfile: config.build.dockerfile.clone(),
            image: build_image.clone(),
            build_args: BTreeMap::from([(key.to_string(), value)]),
            no_cache: true,
        };

        match trigger {
            TriggerContext::PullRequest(number) => {
                steps.push(build_step(PR_BUILD_ARG, number.to_string()));
            }
            TriggerContext::TagPush(version) => {
                let downstream = config.downstream.as_ref().ok_or_else(|| {
                    ReleaseError::InvalidConfig(
                        "タグ push のリリースには downstream ノードが必要です".to_string(),
                    )
                })?;

                steps.push(build_step(TAG_BUILD_ARG, version.to_string()));

                let primary = config.primary();
                let secondary = config.secondary();
                let destinations = [
                    primary.unversioned(&config.image),
                    secondary.unversioned(&config.image),
                    primary.versioned(&config.image, version),
                    secondary.versioned(&config.image, version),
                ];
                for destination in destinations {
                    steps.push(Step::Tag {
                        source: build_image.clone(),
                        destination,
                    });
                }

                for slot in [TargetSlot::Primary, TargetSlot::Secondary] {
                    let target = config.target(slot);
                    steps.push(Step::Login {
                        target: slot,
                        name: target.name.clone(),
                        registry: target.registry.clone(),
                    });
                    steps.push(Step::Push {
                        target: slot,
                        reference: target.unversioned(&config.image),
                    });
                    steps.push(Step::Push {
                        target: slot,
                        reference: target.versioned(&config.image, version),
                    });
                }

                steps.push(Step::TriggerDownstream {
                    command: downstream.command.clone(),
                });
            }
        }

        Ok(Self {
            trigger: trigger.clone(),
            steps,
        })
    }

    /// ログインを含むか（シークレットが必要か）
    pub fn requires_secrets(&self) -> bool {
        self.steps.iter().any(|s| s.kind() == StepKind::Login)
    }

    pub fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|s| s.kind() == kind).count()
    }

    /// プッシュされるイメージ名
    pub fn pushed_references(&self) -> Vec<&ImageReference> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Push { reference, .. } => Some(reference),
                _ => None,
            })
            .collect()
    }
}
