//! Network host abstraction and the host strategies a node can select.
//!
//! A host owns the node's peer table and listen addresses. Dialing and
//! stream multiplexing sit behind it and are not modelled here; `connect`
//! records a peer as reachable.

use async_trait::async_trait;
use ipcs_repo::{Config, PeerId};
use multiaddr::{Multiaddr, Protocol};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Host error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("peer not found: {0}")]
    PeerNotFound(PeerId),

    #[error("cannot dial self")]
    SelfDial,

    #[error("host is closed")]
    Closed,

    #[error("host construction cancelled")]
    Cancelled,
}

/// A peer together with the addresses it can be reached at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: PeerId,
    pub addrs: Vec<String>,
}

/// Parse a transport address such as `/ip4/1.2.3.4/tcp/4001` or
/// `/dns4/example.com/tcp/4001/p2p/Qm...`.
pub fn parse_addr(addr: &str) -> Result<Multiaddr, HostError> {
    // `/ipfs/<id>` is the legacy spelling of `/p2p/<id>`.
    let parsed = addr
        .replace("/ipfs/", "/p2p/")
        .parse::<Multiaddr>()
        .map_err(|_| HostError::InvalidAddress(addr.to_string()))?;
    if parsed.is_empty() {
        return Err(HostError::InvalidAddress(addr.to_string()));
    }
    Ok(parsed)
}

/// The peer named by the address's `/p2p` (or `/ipfs`) component, if any.
pub fn addr_peer_id(addr: &Multiaddr) -> Result<Option<PeerId>, HostError> {
    let Some(peer) = addr.iter().find_map(|p| match p {
        Protocol::P2p(peer) => Some(peer),
        _ => None,
    }) else {
        return Ok(None);
    };

    peer.to_base58()
        .parse::<PeerId>()
        .map(Some)
        .map_err(|_| HostError::InvalidAddress(addr.to_string()))
}

/// Abstract network host.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// The local peer id.
    fn peer_id(&self) -> &PeerId;

    /// Addresses this host accepts connections on.
    fn listen_addrs(&self) -> Vec<String>;

    /// Connect to a peer.
    async fn connect(&self, peer: PeerInfo) -> Result<(), HostError>;

    /// Disconnect from a peer.
    async fn disconnect(&self, peer_id: &PeerId) -> Result<(), HostError>;

    /// Currently connected peers.
    async fn peers(&self) -> Vec<PeerInfo>;

    /// Drop every connection and refuse new ones.
    async fn close(&self) -> Result<(), HostError>;
}

/// Peer-table host used by both host strategies.
pub struct BasicHost {
    local_id: PeerId,
    listen_addrs: Vec<String>,
    peers: Arc<RwLock<HashMap<PeerId, PeerInfo>>>,
    closed: AtomicBool,
}

impl BasicHost {
    pub fn new(local_id: PeerId, listen_addrs: Vec<String>) -> Self {
        Self {
            local_id,
            listen_addrs,
            peers: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), HostError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HostError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Host for BasicHost {
    fn peer_id(&self) -> &PeerId {
        &self.local_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        self.listen_addrs.clone()
    }

    async fn connect(&self, peer: PeerInfo) -> Result<(), HostError> {
        self.ensure_open()?;
        if peer.id == self.local_id {
            return Err(HostError::SelfDial);
        }
        debug!(peer = %peer.id, "peer connected");
        self.peers.write().insert(peer.id.clone(), peer);
        Ok(())
    }

    async fn disconnect(&self, peer_id: &PeerId) -> Result<(), HostError> {
        self.ensure_open()?;
        self.peers
            .write()
            .remove(peer_id)
            .map(|_| ())
            .ok_or_else(|| HostError::PeerNotFound(peer_id.clone()))
    }

    async fn peers(&self) -> Vec<PeerInfo> {
        self.peers.read().values().cloned().collect()
    }

    async fn close(&self) -> Result<(), HostError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(HostError::Closed);
        }
        self.peers.write().clear();
        Ok(())
    }
}

/// What a host strategy needs to build a host.
#[derive(Clone, Debug)]
pub struct HostDeps {
    pub peer_id: PeerId,
    pub config: Config,
}

/// Selects how the node's network host is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostOption {
    /// Listen on the configured swarm addresses.
    #[default]
    Default,
    /// No listen addresses; peers can only be added by dialing out.
    Memory,
}

impl HostOption {
    pub fn resolve(
        &self,
        ctx: &CancellationToken,
        deps: HostDeps,
    ) -> Result<Arc<dyn Host>, HostError> {
        if ctx.is_cancelled() {
            return Err(HostError::Cancelled);
        }

        let listen_addrs = match self {
            HostOption::Default => {
                for addr in &deps.config.addresses.swarm {
                    parse_addr(addr)?;
                }
                deps.config.addresses.swarm.clone()
            }
            HostOption::Memory => Vec::new(),
        };

        Ok(Arc::new(BasicHost::new(deps.peer_id, listen_addrs)))
    }
}
