//! # ipcs-dag
//!
//! Content-addressed Merkle-DAG objects for the IPCS node.
//!
//! This crate provides:
//! - Content identifiers derived from sha2-256 multihashes, rendered as base-58
//! - Immutable-by-convention DAG nodes with ordered, named links
//! - Plain and mutex-guarded key-value datastores
//! - The `DagService` trait and a datastore-backed implementation
//!
//! ## Example
//!
//! ```rust
//! use ipcs_dag::{DagNode, DagService, DatastoreDagService};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let dag = DatastoreDagService::in_memory();
//!
//!     let leaf = DagNode::with_data(b"leaf".to_vec());
//!     let leaf_cid = dag.add(&leaf).await.unwrap();
//!
//!     let mut root = DagNode::with_data(b"root".to_vec());
//!     root.add_node_link("leaf", &leaf).unwrap();
//!     let root_cid = dag.add(&root).await.unwrap();
//!
//!     let fetched = dag.get(&root_cid).await.unwrap();
//!     assert_eq!(fetched.get_link("leaf").unwrap().cid, leaf_cid);
//! });
//! ```

pub mod cid;
pub mod dag;
pub mod datastore;
pub mod node;

pub use cid::{Cid, CidError};
pub use dag::{DagError, DagService, DatastoreDagService, BLOCKS_PREFIX};
pub use datastore::{
    Datastore, DatastoreError, Key, MapDatastore, MutexDatastore, ThreadSafeDatastore,
};
pub use node::{CodecError, DagNode, DagNodeBuilder, Link};
