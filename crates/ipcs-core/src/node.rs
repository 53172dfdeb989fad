//! The running node and its construction from a composed configuration.

use crate::error::{NodeError, Result};
use crate::host::{Host, HostDeps, HostOption};
use crate::patch::{PatchError, Patcher};
use crate::routing::{OfflineRouting, Routing, RoutingDeps, RoutingOption};
use ipcs_dag::{Cid, DatastoreDagService};
use ipcs_repo::{PeerId, Repo};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Whether the node takes part in the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    /// Work purely against local repository state.
    #[default]
    Offline,
}

/// Everything needed to start a node, composed once by the builder.
#[derive(Clone)]
pub struct NodeConfig {
    pub repo: Arc<dyn Repo>,
    pub connectivity: Connectivity,
    pub routing: RoutingOption,
    pub host: HostOption,
}

/// A running node.
pub struct Node {
    peer_id: PeerId,
    connectivity: Connectivity,
    repo: Arc<dyn Repo>,
    dag: Arc<DatastoreDagService>,
    host: Option<Arc<dyn Host>>,
    routing: Arc<dyn Routing>,
}

impl Node {
    /// Construct a node from its configuration.
    ///
    /// The identity stored in the repository is decoded and checked against
    /// its peer id. Online nodes get a host and the selected routing, and
    /// are bootstrapped against the configured peers; unreachable bootstrap
    /// peers are logged, not fatal. Offline nodes have no host and route
    /// against the local datastore only.
    pub async fn new(ctx: &CancellationToken, config: NodeConfig) -> Result<Self> {
        if ctx.is_cancelled() {
            return Err(NodeError::Cancelled);
        }

        let NodeConfig {
            repo,
            connectivity,
            routing,
            host,
        } = config;

        let repo_config = repo.config();
        repo_config.identity.signing_key()?;
        let peer_id = repo_config.identity.peer_id()?;

        let datastore = repo.datastore();
        let dag = Arc::new(DatastoreDagService::new(datastore.clone()));

        let (host, routing): (Option<Arc<dyn Host>>, Arc<dyn Routing>) = match connectivity {
            Connectivity::Offline => (None, Arc::new(OfflineRouting::new(datastore))),
            Connectivity::Online => {
                let host = host.resolve(
                    ctx,
                    HostDeps {
                        peer_id: peer_id.clone(),
                        config: repo_config.clone(),
                    },
                )?;
                let routing = routing.resolve(
                    ctx,
                    RoutingDeps {
                        host: host.clone(),
                        datastore,
                    },
                )?;

                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(NodeError::Cancelled),
                    res = routing.bootstrap(&repo_config.bootstrap) => match res {
                        Ok(n) => info!(peers = n, "bootstrap complete"),
                        Err(e) => warn!(error = %e, "bootstrap failed"),
                    },
                }

                (Some(host), routing)
            }
        };

        info!(%peer_id, ?connectivity, "node started");
        Ok(Node {
            peer_id,
            connectivity,
            repo,
            dag,
            host,
            routing,
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity == Connectivity::Online
    }

    pub fn repo(&self) -> &Arc<dyn Repo> {
        &self.repo
    }

    pub fn dag(&self) -> &Arc<DatastoreDagService> {
        &self.dag
    }

    /// The network host; `None` while offline.
    pub fn host(&self) -> Option<&Arc<dyn Host>> {
        self.host.as_ref()
    }

    pub fn routing(&self) -> &Arc<dyn Routing> {
        &self.routing
    }

    /// A patcher over this node's DAG service.
    pub fn patcher(&self) -> Patcher {
        Patcher::new(self.dag.clone())
    }

    /// Patch an object stored on this node.
    pub async fn patch<S: AsRef<str>>(
        &self,
        ctx: &CancellationToken,
        root: &str,
        command: &str,
        args: &[S],
    ) -> std::result::Result<Cid, PatchError> {
        self.patcher().patch(ctx, root, command, args).await
    }

    /// Close the host, if any, and then the repository.
    ///
    /// The repository is closed even when the host fails to close; the
    /// first error is returned.
    pub async fn close(&self) -> Result<()> {
        let host_res = match &self.host {
            Some(host) => host.close().await,
            None => Ok(()),
        };
        let repo_res = self.repo.close();
        host_res?;
        repo_res?;
        info!(peer_id = %self.peer_id, "node closed");
        Ok(())
    }
}
