use async_trait::async_trait;
use krkn_release_core::{
    BuildImage, BuildRequest, Checkout, Collaborators, CredentialPair, DownstreamRebuild,
    ImageArtifact, ImageReference, LoginRegistry, MaterializeDockerfile, PushImage,
    RegistrySession, ReleaseError, Result, Secret, TagImage, TargetSlot, TriggerContext,
    WorkingTree,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// フェイクが受け取った呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Checkout(TriggerContext),
    Materialize(PathBuf),
    Build {
        image: String,
        context: PathBuf,
        build_args: BTreeMap<String, String>,
        no_cache: bool,
    },
    Tag {
        source: String,
        destination: String,
    },
    Login {
        target: TargetSlot,
        registry: String,
        username: String,
        token: String,
    },
    Push {
        target: TargetSlot,
        reference: String,
        username: String,
    },
    Downstream {
        username: String,
        token: String,
        autopush: bool,
    },
}

/// どの呼び出しを失敗させるか
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Failure {
    Checkout,
    Materialize,
    Build,
    Login(TargetSlot),
    Push(String),
    Downstream,
}

/// 全コラボレーターを兼ねる記録用フェイク
#[derive(Clone, Default)]
pub struct FakeWorld {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail: Option<Failure>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail: Failure) -> Self {
        Self {
            fail: Some(fail),
            ..Self::default()
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            checkout: Box::new(self.clone()),
            materializer: Box::new(self.clone()),
            builder: Box::new(self.clone()),
            tagger: Box::new(self.clone()),
            login: Box::new(self.clone()),
            pusher: Box::new(self.clone()),
            downstream: Box::new(self.clone()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn should_fail(&self, failure: &Failure) -> bool {
        self.fail.as_ref() == Some(failure)
    }
}

#[async_trait]
impl Checkout for FakeWorld {
    async fn checkout(&self, trigger: &TriggerContext) -> Result<WorkingTree> {
        self.record(Call::Checkout(trigger.clone()));
        if self.should_fail(&Failure::Checkout) {
            return Err(ReleaseError::Checkout("clone failed".to_string()));
        }
        Ok(WorkingTree::new("/work"))
    }
}

#[async_trait]
impl MaterializeDockerfile for FakeWorld {
    async fn materialize(&self, tree: &WorkingTree, script: &Path) -> Result<()> {
        self.record(Call::Materialize(tree.resolve(script)));
        if self.should_fail(&Failure::Materialize) {
            return Err(ReleaseError::Materialize("exit status 1".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BuildImage for FakeWorld {
    async fn build(&self, request: &BuildRequest) -> Result<ImageArtifact> {
        self.record(Call::Build {
            image: request.image.to_string(),
            context: request.context.clone(),
            build_args: request.build_args.clone(),
            no_cache: request.no_cache,
        });
        if self.should_fail(&Failure::Build) {
            return Err(ReleaseError::Build("RUN failed".to_string()));
        }
        Ok(ImageArtifact::new(request.image.to_string()))
    }
}

#[async_trait]
impl TagImage for FakeWorld {
    async fn tag(&self, source: &ImageArtifact, destination: &ImageReference) -> Result<()> {
        self.record(Call::Tag {
            source: source.base_tag.clone(),
            destination: destination.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl LoginRegistry for FakeWorld {
    async fn login(
        &self,
        target: TargetSlot,
        registry: &str,
        credentials: &CredentialPair,
    ) -> Result<RegistrySession> {
        self.record(Call::Login {
            target,
            registry: registry.to_string(),
            username: credentials.username.expose().clone(),
            token: credentials.token.expose().clone(),
        });
        if self.should_fail(&Failure::Login(target)) {
            return Err(ReleaseError::Login {
                target: target.to_string(),
                registry: registry.to_string(),
                message: "unauthorized".to_string(),
            });
        }
        Ok(RegistrySession::new(target, registry, credentials.clone()))
    }
}

#[async_trait]
impl PushImage for FakeWorld {
    async fn push(&self, session: &RegistrySession, reference: &ImageReference) -> Result<()> {
        self.record(Call::Push {
            target: session.target(),
            reference: reference.to_string(),
            username: session.credentials().username.expose().clone(),
        });
        if self.should_fail(&Failure::Push(reference.to_string())) {
            return Err(ReleaseError::Push {
                reference: reference.to_string(),
                message: "denied".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DownstreamRebuild for FakeWorld {
    async fn trigger(&self, credentials: &CredentialPair, autopush: &Secret<bool>) -> Result<()> {
        self.record(Call::Downstream {
            username: credentials.username.expose().clone(),
            token: credentials.token.expose().clone(),
            autopush: *autopush.expose(),
        });
        if self.should_fail(&Failure::Downstream) {
            return Err(ReleaseError::Downstream("exit status 2".to_string()));
        }
        Ok(())
    }
}

pub const RELEASE_KDL: &str = r#"
release "krkn"
image "krkn"

build {
    context "containers"
}

target "krkn-chaos" {
    registry "quay.io"
    namespace "quay.io/krkn-chaos"
    username "env:USER_1"
    token "env:TOKEN_1"
}

target "redhat-chaos" {
    registry "quay.io"
    namespace "quay.io/redhat-chaos"
    username "env:USER_2"
    token "env:TOKEN_2"
}

downstream {
    command "trigger-downstream"
    autopush "env:AUTOPUSH"
}
"#;
