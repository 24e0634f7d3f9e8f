//! リリースオーケストレーター
//!
//! [`ReleasePlan`] のステップを順番に1つずつ実行する。
//! 最初に失敗したステップで中断し、残りはスキップとして記録する。
//! 失敗時のロールバックや再試行は行わない。

use crate::collaborator::{BuildRequest, Collaborators, RegistrySession, WorkingTree};
use crate::error::{ReleaseError, Result};
use crate::model::ImageArtifact;
use crate::plan::{ReleasePlan, Step};
use crate::secret::ReleaseSecrets;
use crate::trigger::TriggerContext;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, warn};

/// ステップの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub elapsed_ms: u64,
}

/// 実行結果
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub trigger: TriggerContext,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    /// プッシュに成功したイメージ
    pub pushed: Vec<String>,
    pub artifact: Option<ImageArtifact>,
}

impl ReleaseReport {
    pub fn succeeded(&self) -> bool {
        self.failed_step().is_none()
            && self.steps.iter().all(|r| r.status == StepStatus::Succeeded)
    }

    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|r| matches!(r.status, StepStatus::Failed(_)))
    }
}

/// 失敗した実行
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ReleaseFailure {
    pub report: Box<ReleaseReport>,
    #[source]
    pub error: ReleaseError,
}

/// 実行中に引き継ぐ状態
#[derive(Default)]
struct RunState {
    tree: Option<WorkingTree>,
    artifact: Option<ImageArtifact>,
    session: Option<RegistrySession>,
}

impl RunState {
    fn tree(&self) -> Result<&WorkingTree> {
        self.tree
            .as_ref()
            .ok_or_else(|| ReleaseError::Checkout("ワークツリーがありません".to_string()))
    }
}

pub struct ReleaseOrchestrator {
    collaborators: Collaborators,
}

impl ReleaseOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// プランを実行する
    ///
    /// ログインを含むプランには `secrets` が必要。
    pub async fn execute(
        &self,
        plan: &ReleasePlan,
        secrets: Option<&ReleaseSecrets>,
    ) -> std::result::Result<ReleaseReport, ReleaseFailure> {
        let started_at = Utc::now();
        let mut state = RunState::default();
        let mut records = Vec::with_capacity(plan.steps.len());
        let mut pushed = Vec::new();

        let mut failure = if plan.requires_secrets() && secrets.is_none() {
            Some(ReleaseError::SecretUnavailable(
                "タグ push にはレジストリの認証情報が必要です".to_string(),
            ))
        } else {
            None
        };

        info!(trigger = %plan.trigger, steps = plan.steps.len(), "Starting release");

        for step in &plan.steps {
            if failure.is_some() {
                records.push(StepRecord {
                    step: step.clone(),
                    status: StepStatus::Skipped,
                    elapsed_ms: 0,
                });
                continue;
            }

            info!(step = %step.kind(), "{}", step);
            let started = Instant::now();
            let result = self.run_step(step, &plan.trigger, secrets, &mut state).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let status = match result {
                Ok(()) => {
                    if let Step::Push { reference, .. } = step {
                        pushed.push(reference.to_string());
                    }
                    StepStatus::Succeeded
                }
                Err(e) => {
                    error!(step = %step.kind(), error = %e, "Step failed");
                    let status = StepStatus::Failed(e.to_string());
                    failure = Some(e);
                    status
                }
            };

            records.push(StepRecord {
                step: step.clone(),
                status,
                elapsed_ms,
            });
        }

        let report = ReleaseReport {
            trigger: plan.trigger.clone(),
            started_at,
            finished_at: Utc::now(),
            steps: records,
            pushed,
            artifact: state.artifact,
        };

        match failure {
            Some(error) => {
                if !report.pushed.is_empty() {
                    warn!(
                        pushed = ?report.pushed,
                        "Release aborted after some images were pushed; re-run to converge registries"
                    );
                }
                Err(ReleaseFailure {
                    report: Box::new(report),
                    error,
                })
            }
            None => {
                info!(pushed = report.pushed.len(), "Release completed");
                Ok(report)
            }
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        trigger: &TriggerContext,
        secrets: Option<&ReleaseSecrets>,
        state: &mut RunState,
    ) -> Result<()> {
        let c = &self.collaborators;

        match step {
            Step::Checkout { .. } => {
                state.tree = Some(c.checkout.checkout(trigger).await?);
            }
            Step::MaterializeDockerfile { script } => {
                c.materializer.materialize(state.tree()?, script).await?;
            }
            Step::Build {
                context,
                dockerfile,
                image,
                build_args,
                no_cache,
            } => {
                let tree = state.tree()?;
                let request = BuildRequest {
                    context: tree.resolve(context),
                    dockerfile: tree.resolve(dockerfile),
                    image: image.clone(),
                    build_args: build_args.clone(),
                    no_cache: *no_cache,
                };
                state.artifact = Some(c.builder.build(&request).await?);
            }
            Step::Tag { destination, .. } => {
                let artifact = state.artifact.as_mut().ok_or_else(|| ReleaseError::Tag {
                    reference: destination.to_string(),
                    message: "元イメージがビルドされていません".to_string(),
                })?;
                c.tagger.tag(artifact, destination).await?;
                artifact.applied_tags.insert(destination.to_string());
            }
            Step::Login {
                target, registry, ..
            } => {
                // 前のターゲットのセッションは持ち越さない
                state.session = None;
                let secrets = require_secrets(secrets)?;
                let session = c
                    .login
                    .login(*target, registry, secrets.credentials(*target))
                    .await?;
                state.session = Some(session);
            }
            Step::Push { target, reference } => {
                let session = state
                    .session
                    .as_ref()
                    .filter(|s| s.target() == *target)
                    .ok_or_else(|| ReleaseError::SessionMismatch {
                        reference: reference.to_string(),
                        expected: target.to_string(),
                        actual: state
                            .session
                            .as_ref()
                            .map(|s| s.target().to_string())
                            .unwrap_or_else(|| "なし".to_string()),
                    })?;
                c.pusher.push(session, reference).await?;
            }
            Step::TriggerDownstream { .. } => {
                let secrets = require_secrets(secrets)?;
                c.downstream
                    .trigger(&secrets.target1, &secrets.autopush)
                    .await?;
            }
        }

        Ok(())
    }
}

fn require_secrets(secrets: Option<&ReleaseSecrets>) -> Result<&ReleaseSecrets> {
    secrets.ok_or_else(|| {
        ReleaseError::SecretUnavailable("レジストリの認証情報が渡されていません".to_string())
    })
}
