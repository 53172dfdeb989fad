//! Single-use node builder.

use crate::error::{NodeError, Result};
use crate::host::HostOption;
use crate::node::{Connectivity, Node, NodeConfig};
use crate::routing::RoutingOption;
use ipcs_repo::{default_repo_with, Repo, RepoDefaults};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Builder for a [`Node`].
///
/// Setters never fail; everything is checked in [`build`](Self::build),
/// which can be called exactly once. A failed build still consumes the
/// builder.
///
/// # Example
///
/// ```rust
/// use ipcs_core::{NodeBuilder, RoutingOption};
/// use tokio_util::sync::CancellationToken;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let ctx = CancellationToken::new();
///     let mut builder = NodeBuilder::new();
///     builder.offline().set_routing(RoutingOption::Nil);
///
///     let node = builder.build(&ctx).await.unwrap();
///     assert!(!node.is_online());
///     assert!(builder.build(&ctx).await.is_err());
/// });
/// ```
#[derive(Default)]
pub struct NodeBuilder {
    connectivity: Connectivity,
    routing: RoutingOption,
    host: HostOption,
    repo: Option<Arc<dyn Repo>>,
    repo_defaults: RepoDefaults,
    built: bool,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn online(&mut self) -> &mut Self {
        self.set_connectivity(Connectivity::Online)
    }

    pub fn offline(&mut self) -> &mut Self {
        self.set_connectivity(Connectivity::Offline)
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> &mut Self {
        self.connectivity = connectivity;
        self
    }

    pub fn set_routing(&mut self, routing: RoutingOption) -> &mut Self {
        self.routing = routing;
        self
    }

    pub fn set_host(&mut self, host: HostOption) -> &mut Self {
        self.host = host;
        self
    }

    pub fn set_repo(&mut self, repo: Arc<dyn Repo>) -> &mut Self {
        self.repo = Some(repo);
        self
    }

    /// Defaults used when a repository has to be synthesized.
    pub fn set_repo_defaults(&mut self, defaults: RepoDefaults) -> &mut Self {
        self.repo_defaults = defaults;
        self
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Build the node.
    ///
    /// Fails with [`NodeError::AlreadyBuilt`] on every call after the first.
    pub async fn build(&mut self, ctx: &CancellationToken) -> Result<Node> {
        if self.built {
            return Err(NodeError::AlreadyBuilt);
        }
        self.built = true;

        let repo = match self.repo.take() {
            Some(repo) => repo,
            None => {
                debug!("no repository set, synthesizing one");
                default_repo_with(&self.repo_defaults)?
            }
        };

        let config = NodeConfig {
            repo,
            connectivity: self.connectivity,
            routing: self.routing,
            host: self.host,
        };
        Node::new(ctx, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipcs_repo::{Identity, MemoryRepo};

    fn quiet() -> RepoDefaults {
        RepoDefaults::default().with_bootstrap(Vec::new())
    }

    #[test]
    fn test_defaults() {
        let builder = NodeBuilder::new();
        assert_eq!(builder.connectivity, Connectivity::Offline);
        assert_eq!(builder.routing, RoutingOption::Dht);
        assert_eq!(builder.host, HostOption::Default);
        assert!(builder.repo.is_none());
        assert!(!builder.is_built());
    }

    #[test]
    fn test_setters_chain() {
        let mut builder = NodeBuilder::new();
        builder
            .online()
            .set_routing(RoutingOption::Nil)
            .set_host(HostOption::Memory)
            .offline()
            .online();

        assert_eq!(builder.connectivity, Connectivity::Online);
        assert_eq!(builder.routing, RoutingOption::Nil);
        assert_eq!(builder.host, HostOption::Memory);
    }

    #[test]
    fn test_build_twice() {
        tokio_test::block_on(async {
            let ctx = CancellationToken::new();
            let mut builder = NodeBuilder::new();
            builder.set_repo_defaults(quiet());

            assert!(builder.build(&ctx).await.is_ok());
            assert!(matches!(
                builder.build(&ctx).await,
                Err(NodeError::AlreadyBuilt)
            ));
        });
    }

    #[tokio::test]
    async fn test_failed_build_consumes_builder() {
        let ctx = CancellationToken::new();
        let mut builder = NodeBuilder::new();

        // Broken identity: peer id does not match the key.
        let mut config = quiet().config_for(Identity::generate().unwrap());
        config.identity.priv_key = "AAAA".to_string();
        builder.set_repo(Arc::new(MemoryRepo::new(config)));

        assert!(matches!(builder.build(&ctx).await, Err(NodeError::Repo(_))));
        assert!(builder.is_built());
        assert!(matches!(
            builder.build(&ctx).await,
            Err(NodeError::AlreadyBuilt)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_build_consumes_builder() {
        let ctx = CancellationToken::new();
        ctx.cancel();

        let mut builder = NodeBuilder::new();
        assert!(matches!(builder.build(&ctx).await, Err(NodeError::Cancelled)));
        assert!(matches!(
            builder.build(&ctx).await,
            Err(NodeError::AlreadyBuilt)
        ));
    }

    #[tokio::test]
    async fn test_supplied_repo_is_used() {
        let ctx = CancellationToken::new();
        let repo: Arc<dyn Repo> = Arc::new(MemoryRepo::new(
            quiet().config_for(Identity::generate().unwrap()),
        ));

        let mut builder = NodeBuilder::new();
        builder.set_repo(repo.clone());
        let node = builder.build(&ctx).await.unwrap();

        assert!(Arc::ptr_eq(node.repo(), &repo));
        assert_eq!(
            node.peer_id().as_str(),
            repo.config().identity.peer_id
        );
    }

    #[tokio::test]
    async fn test_synthesized_repo_uses_defaults() {
        let ctx = CancellationToken::new();
        let swarm = vec!["/ip4/127.0.0.1/tcp/5001".to_string()];

        let mut builder = NodeBuilder::new();
        builder
            .online()
            .set_repo_defaults(quiet().with_swarm(swarm.clone()));
        let node = builder.build(&ctx).await.unwrap();

        let config = node.repo().config();
        assert_eq!(config.addresses.swarm, swarm);
        assert!(config.bootstrap.is_empty());
        assert_eq!(node.host().unwrap().listen_addrs(), swarm);
    }
}
