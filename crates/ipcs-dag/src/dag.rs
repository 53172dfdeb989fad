//! DAG service trait and the datastore-backed implementation.
//!
//! The DAG service provides content-addressed storage for DAG nodes. A
//! node is stored under the identifier computed from its canonical bytes,
//! so adding identical content twice is idempotent.

use crate::cid::Cid;
use crate::datastore::{DatastoreError, Key, MapDatastore, MutexDatastore, ThreadSafeDatastore};
use crate::node::{CodecError, DagNode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Namespace under which node blocks are kept.
pub const BLOCKS_PREFIX: &str = "/blocks";

/// Errors that can occur during DAG operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("node not found: {0}")]
    NotFound(Cid),

    #[error("verification failed for {0}: stored bytes hash to a different identifier")]
    VerificationFailed(Cid),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("datastore error: {0}")]
    Datastore(DatastoreError),
}

/// Content-addressed storage for DAG nodes.
#[async_trait]
pub trait DagService: Send + Sync {
    /// Fetch a node by its identifier.
    async fn get(&self, cid: &Cid) -> Result<DagNode, DagError>;

    /// Store a node, returning the identifier derived from its content.
    async fn add(&self, node: &DagNode) -> Result<Cid, DagError>;

    /// Check if a node exists in the store.
    async fn has(&self, cid: &Cid) -> Result<bool, DagError>;

    /// Remove a node. Removing an absent node fails with `NotFound`.
    async fn remove(&self, cid: &Cid) -> Result<(), DagError>;
}

/// A [`DagService`] that keeps encoded nodes in a key-value datastore.
#[derive(Clone)]
pub struct DatastoreDagService {
    datastore: Arc<dyn ThreadSafeDatastore>,
}

impl DatastoreDagService {
    pub fn new(datastore: Arc<dyn ThreadSafeDatastore>) -> Self {
        DatastoreDagService { datastore }
    }

    /// A service over a fresh mutex-guarded in-memory datastore.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MutexDatastore::new(MapDatastore::new())))
    }

    /// The backing datastore.
    pub fn datastore(&self) -> &Arc<dyn ThreadSafeDatastore> {
        &self.datastore
    }

    /// Identifiers of every stored node.
    pub fn cids(&self) -> Result<Vec<Cid>, DagError> {
        let keys = self
            .datastore
            .keys(&Key::new(BLOCKS_PREFIX))
            .map_err(DagError::Datastore)?;
        Ok(keys
            .iter()
            .filter_map(|k| Cid::from_base58(k.name()).ok())
            .collect())
    }

    fn block_key(cid: &Cid) -> Key {
        Key::new(BLOCKS_PREFIX).child(cid.to_base58())
    }
}

#[async_trait]
impl DagService for DatastoreDagService {
    async fn get(&self, cid: &Cid) -> Result<DagNode, DagError> {
        let bytes = self
            .datastore
            .get(&Self::block_key(cid))
            .map_err(|e| match e {
                DatastoreError::NotFound(_) => DagError::NotFound(*cid),
                other => DagError::Datastore(other),
            })?;

        if Cid::hash(&bytes) != *cid {
            return Err(DagError::VerificationFailed(*cid));
        }

        trace!(cid = %cid.short(), len = bytes.len(), "dag get");
        Ok(DagNode::decode(&bytes)?)
    }

    async fn add(&self, node: &DagNode) -> Result<Cid, DagError> {
        let bytes = node.encode()?;
        let cid = Cid::hash(&bytes);
        let len = bytes.len();

        self.datastore
            .put(Self::block_key(&cid), bytes)
            .map_err(DagError::Datastore)?;

        debug!(cid = %cid.short(), len, links = node.links().len(), "dag add");
        Ok(cid)
    }

    async fn has(&self, cid: &Cid) -> Result<bool, DagError> {
        self.datastore
            .has(&Self::block_key(cid))
            .map_err(DagError::Datastore)
    }

    async fn remove(&self, cid: &Cid) -> Result<(), DagError> {
        self.datastore
            .delete(&Self::block_key(cid))
            .map_err(|e| match e {
                DatastoreError::NotFound(_) => DagError::NotFound(*cid),
                other => DagError::Datastore(other),
            })
    }
}
