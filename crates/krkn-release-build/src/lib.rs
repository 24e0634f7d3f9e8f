//! krkn-release の実行系
//!
//! コアで定義されたコラボレーターを、Docker デーモン (Bollard)、git、
//! シェルスクリプトで実装します。

pub mod auth;
pub mod builder;
pub mod checkout;
pub mod command;
pub mod context;
pub mod downstream;
pub mod error;
pub mod progress;
pub mod pusher;
pub mod script;
pub mod tagger;

pub use auth::DockerRegistryLogin;
pub use builder::DockerImageBuilder;
pub use checkout::GitCheckout;
pub use context::BuildContext;
pub use downstream::CommandDownstream;
pub use error::{BuildError, BuildResult};
pub use progress::BuildProgress;
pub use pusher::DockerImagePusher;
pub use script::ScriptMaterializer;
pub use tagger::DockerImageTagger;

use bollard::Docker;
use krkn_release_core::{Collaborators, ReleaseConfig};

/// 設定から実運用のコラボレーター一式を組み立てる
pub fn collaborators(docker: Docker, config: &ReleaseConfig) -> Collaborators {
    let tree = config.working_tree();
    let command = config
        .downstream
        .as_ref()
        .map(|d| d.command.clone())
        .unwrap_or_default();

    Collaborators {
        checkout: Box::new(GitCheckout::new(
            tree.clone(),
            config.checkout.repository.clone(),
        )),
        materializer: Box::new(ScriptMaterializer::new()),
        builder: Box::new(DockerImageBuilder::new(docker.clone())),
        tagger: Box::new(DockerImageTagger::new(docker.clone())),
        login: Box::new(DockerRegistryLogin::new()),
        pusher: Box::new(DockerImagePusher::new(docker)),
        downstream: Box::new(CommandDownstream::new(command, tree)),
    }
}
