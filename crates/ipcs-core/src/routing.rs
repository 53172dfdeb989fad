//! Content and value routing, and the routing strategies a node can select.
//!
//! Records are kept in the node's datastore under `/dht`. The distributed
//! lookup protocol itself is not part of this crate; routing strategies only
//! decide which records are kept locally and which peers are contacted.

use crate::host::{addr_peer_id, parse_addr, Host, HostError, PeerInfo};
use async_trait::async_trait;
use futures::future::join_all;
use ipcs_dag::{Cid, DatastoreError, Key, ThreadSafeDatastore};
use ipcs_repo::PeerId;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const VALUES_PREFIX: &str = "/dht/values";
const PROVIDERS_PREFIX: &str = "/dht/providers";

/// Routing error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("routing record not found: {0}")]
    NotFound(String),

    #[error("routing is unavailable while offline")]
    Offline,

    #[error("routing datastore error: {0}")]
    Datastore(#[from] DatastoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("routing construction cancelled")]
    Cancelled,
}

/// Value and provider routing.
#[async_trait]
pub trait Routing: Send + Sync + 'static {
    /// Store a value record.
    async fn put_value(&self, key: &str, value: Vec<u8>) -> Result<(), RoutingError>;

    /// Look up a value record.
    async fn get_value(&self, key: &str) -> Result<Vec<u8>, RoutingError>;

    /// Announce that the local peer can serve `cid`.
    async fn provide(&self, cid: &Cid) -> Result<(), RoutingError>;

    /// Peers known to serve `cid`.
    async fn find_providers(&self, cid: &Cid) -> Result<Vec<PeerId>, RoutingError>;

    /// Connect to the given bootstrap peers, returning how many succeeded.
    async fn bootstrap(&self, addrs: &[String]) -> Result<usize, RoutingError>;
}

/// Value records in a datastore namespace.
#[derive(Clone)]
struct RecordStore {
    datastore: Arc<dyn ThreadSafeDatastore>,
}

impl RecordStore {
    fn value_key(key: &str) -> Key {
        Key::new(VALUES_PREFIX).child(key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RoutingError> {
        Ok(self.datastore.put(Self::value_key(key), value)?)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        self.datastore
            .get(&Self::value_key(key))
            .map_err(|e| match e {
                DatastoreError::NotFound(_) => RoutingError::NotFound(key.to_string()),
                other => RoutingError::Datastore(other),
            })
    }
}

/// Routing for an online node: records in the local datastore, bootstrap
/// peers registered with the host.
pub struct DhtRouting {
    host: Arc<dyn Host>,
    records: RecordStore,
}

impl DhtRouting {
    pub fn new(host: Arc<dyn Host>, datastore: Arc<dyn ThreadSafeDatastore>) -> Self {
        Self {
            host,
            records: RecordStore { datastore },
        }
    }

    fn providers_key(cid: &Cid) -> Key {
        Key::new(PROVIDERS_PREFIX).child(cid.to_base58())
    }
}

#[async_trait]
impl Routing for DhtRouting {
    async fn put_value(&self, key: &str, value: Vec<u8>) -> Result<(), RoutingError> {
        self.records.put(key, value)
    }

    async fn get_value(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        self.records.get(key)
    }

    async fn provide(&self, cid: &Cid) -> Result<(), RoutingError> {
        let key = Self::providers_key(cid).child(self.host.peer_id().as_str());
        self.records.datastore.put(key, Vec::new())?;
        debug!(cid = %cid.short(), "providing");
        Ok(())
    }

    async fn find_providers(&self, cid: &Cid) -> Result<Vec<PeerId>, RoutingError> {
        let keys = self.records.datastore.keys(&Self::providers_key(cid))?;
        Ok(keys
            .iter()
            .filter_map(|k| k.name().parse::<PeerId>().ok())
            .collect())
    }

    async fn bootstrap(&self, addrs: &[String]) -> Result<usize, RoutingError> {
        let mut peers = Vec::new();
        for addr in addrs {
            let peer = parse_addr(addr).and_then(|ma| addr_peer_id(&ma));
            match peer {
                Ok(Some(id)) if &id != self.host.peer_id() => peers.push(PeerInfo {
                    id,
                    addrs: vec![addr.clone()],
                }),
                Ok(Some(_)) => {}
                Ok(None) => warn!(%addr, "bootstrap address has no peer id"),
                Err(e) => warn!(%addr, error = %e, "skipping bootstrap address"),
            }
        }

        let results = join_all(peers.into_iter().map(|p| self.host.connect(p))).await;
        let connected = results.iter().filter(|r| r.is_ok()).count();
        if let Some(Err(e)) = results.into_iter().find(|r| r.is_err()) {
            if connected == 0 {
                return Err(e.into());
            }
        }
        Ok(connected)
    }
}

/// Routing that stores nothing remotely and finds nothing.
pub struct NilRouting;

#[async_trait]
impl Routing for NilRouting {
    async fn put_value(&self, _key: &str, _value: Vec<u8>) -> Result<(), RoutingError> {
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        Err(RoutingError::NotFound(key.to_string()))
    }

    async fn provide(&self, _cid: &Cid) -> Result<(), RoutingError> {
        Ok(())
    }

    async fn find_providers(&self, _cid: &Cid) -> Result<Vec<PeerId>, RoutingError> {
        Ok(Vec::new())
    }

    async fn bootstrap(&self, _addrs: &[String]) -> Result<usize, RoutingError> {
        Ok(0)
    }
}

/// Routing for an offline node. Values stay in the local datastore;
/// anything that would need the network fails with `Offline`.
pub struct OfflineRouting {
    records: RecordStore,
}

impl OfflineRouting {
    pub fn new(datastore: Arc<dyn ThreadSafeDatastore>) -> Self {
        Self {
            records: RecordStore { datastore },
        }
    }
}

#[async_trait]
impl Routing for OfflineRouting {
    async fn put_value(&self, key: &str, value: Vec<u8>) -> Result<(), RoutingError> {
        self.records.put(key, value)
    }

    async fn get_value(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        self.records.get(key)
    }

    async fn provide(&self, _cid: &Cid) -> Result<(), RoutingError> {
        Err(RoutingError::Offline)
    }

    async fn find_providers(&self, _cid: &Cid) -> Result<Vec<PeerId>, RoutingError> {
        Err(RoutingError::Offline)
    }

    async fn bootstrap(&self, _addrs: &[String]) -> Result<usize, RoutingError> {
        Err(RoutingError::Offline)
    }
}

/// What a routing strategy needs to build its router.
#[derive(Clone)]
pub struct RoutingDeps {
    pub host: Arc<dyn Host>,
    pub datastore: Arc<dyn ThreadSafeDatastore>,
}

/// Selects the routing implementation of an online node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoutingOption {
    #[default]
    Dht,
    Nil,
}

impl RoutingOption {
    pub fn resolve(
        &self,
        ctx: &CancellationToken,
        deps: RoutingDeps,
    ) -> Result<Arc<dyn Routing>, RoutingError> {
        if ctx.is_cancelled() {
            return Err(RoutingError::Cancelled);
        }

        Ok(match self {
            RoutingOption::Dht => Arc::new(DhtRouting::new(deps.host, deps.datastore)),
            RoutingOption::Nil => Arc::new(NilRouting),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BasicHost;
    use ipcs_dag::{MapDatastore, MutexDatastore};
    use ipcs_repo::Identity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn peer(seed: u64) -> PeerId {
        Identity::generate_with(&mut StdRng::seed_from_u64(seed))
            .unwrap()
            .peer_id()
            .unwrap()
    }

    fn datastore() -> Arc<dyn ThreadSafeDatastore> {
        Arc::new(MutexDatastore::new(MapDatastore::new()))
    }

    fn dht(local: u64) -> (Arc<BasicHost>, DhtRouting) {
        let host = Arc::new(BasicHost::new(peer(local), vec![]));
        let routing = DhtRouting::new(host.clone(), datastore());
        (host, routing)
    }

    #[tokio::test]
    async fn test_dht_values() {
        let (_host, routing) = dht(1);

        routing.put_value("/ipns/name", b"v1".to_vec()).await.unwrap();
        assert_eq!(routing.get_value("/ipns/name").await.unwrap(), b"v1");
        assert_eq!(
            routing.get_value("/ipns/other").await,
            Err(RoutingError::NotFound("/ipns/other".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dht_providers() {
        let (host, routing) = dht(1);
        let cid = Cid::hash(b"content");

        assert!(routing.find_providers(&cid).await.unwrap().is_empty());
        routing.provide(&cid).await.unwrap();
        assert_eq!(
            routing.find_providers(&cid).await.unwrap(),
            vec![host.peer_id().clone()]
        );
    }

    #[tokio::test]
    async fn test_dht_bootstrap() {
        let (host, routing) = dht(1);
        let addrs = vec![
            format!("/ip4/10.0.0.1/tcp/4001/ipfs/{}", peer(2)),
            format!("/ip4/10.0.0.2/tcp/4001/ipfs/{}", peer(3)),
            format!("/dns4/bootstrap.example.org/tcp/4001/p2p/{}", peer(4)),
            // own address is skipped
            format!("/ip4/10.0.0.3/tcp/4001/ipfs/{}", peer(1)),
            "/ip4/10.0.0.4/tcp/4001".to_string(),
            "garbage".to_string(),
        ];

        assert_eq!(routing.bootstrap(&addrs).await.unwrap(), 3);
        assert_eq!(host.peers().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dht_bootstrap_on_closed_host() {
        let (host, routing) = dht(1);
        host.close().await.unwrap();

        let addrs = vec![format!("/ip4/10.0.0.1/tcp/4001/ipfs/{}", peer(2))];
        assert_eq!(
            routing.bootstrap(&addrs).await,
            Err(RoutingError::Host(HostError::Closed))
        );
    }

    #[tokio::test]
    async fn test_offline_routing() {
        let routing = OfflineRouting::new(datastore());
        let cid = Cid::hash(b"content");

        routing.put_value("k", b"v".to_vec()).await.unwrap();
        assert_eq!(routing.get_value("k").await.unwrap(), b"v");
        assert_eq!(routing.provide(&cid).await, Err(RoutingError::Offline));
        assert_eq!(routing.find_providers(&cid).await, Err(RoutingError::Offline));
        assert_eq!(routing.bootstrap(&[]).await, Err(RoutingError::Offline));
    }

    #[tokio::test]
    async fn test_nil_routing() {
        let routing = NilRouting;
        routing.put_value("k", b"v".to_vec()).await.unwrap();
        assert!(matches!(
            routing.get_value("k").await,
            Err(RoutingError::NotFound(_))
        ));
        assert_eq!(routing.bootstrap(&["x".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_routing_option_resolve() {
        let ctx = CancellationToken::new();
        let deps = RoutingDeps {
            host: Arc::new(BasicHost::new(peer(1), vec![])),
            datastore: datastore(),
        };

        let nil = RoutingOption::Nil.resolve(&ctx, deps.clone()).unwrap();
        assert!(nil.find_providers(&Cid::hash(b"x")).await.unwrap().is_empty());

        let dht = RoutingOption::Dht.resolve(&ctx, deps.clone()).unwrap();
        dht.put_value("k", vec![1]).await.unwrap();
        // Records land in the shared datastore.
        assert!(deps.datastore.has(&Key::new("/dht/values/k")).unwrap());

        ctx.cancel();
        assert!(matches!(
            RoutingOption::Dht.resolve(&ctx, deps),
            Err(RoutingError::Cancelled)
        ));
    }
}
