//! # ipcs-core
//!
//! Node assembly and object patching for the IPCS node.
//!
//! A [`NodeBuilder`] combines a connectivity mode, a routing strategy, a host
//! strategy and a repository into a running [`Node`]. When no repository is
//! supplied, one is synthesized with a fresh identity and an in-memory
//! datastore.
//!
//! The [`Patcher`] derives new DAG objects from stored ones by adding or
//! removing named links. The original object is never modified.
//!
//! # Quick Start
//!
//! ```rust
//! use ipcs_core::{encode_text, NodeBuilder, ADD_LINK};
//! use ipcs_dag::{DagNode, DagService};
//! use tokio_util::sync::CancellationToken;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let ctx = CancellationToken::new();
//!     let node = NodeBuilder::new().build(&ctx).await.unwrap();
//!
//!     let root = node.dag().add(&DagNode::with_data(b"root".to_vec())).await.unwrap();
//!     let child = node.dag().add(&DagNode::with_data(b"child".to_vec())).await.unwrap();
//!
//!     let child_text = child.to_base58();
//!     let patched = node
//!         .patch(&ctx, &root.to_base58(), ADD_LINK, &["child", child_text.as_str()])
//!         .await
//!         .unwrap();
//!     assert!(encode_text(&patched).ends_with('\n'));
//! });
//! ```
//!
//! # Architecture
//!
//! - [`builder`] - single-use node builder
//! - [`node`] - the running node and its composed configuration
//! - [`host`] - network host abstraction and host strategies
//! - [`routing`] - value and provider routing strategies
//! - [`patch`] - link edits on stored objects
//! - [`error`] - node error types

pub mod builder;
pub mod error;
pub mod host;
pub mod node;
pub mod patch;
pub mod routing;

pub use builder::NodeBuilder;
pub use error::{NodeError, Result};
pub use host::{
    addr_peer_id, parse_addr, BasicHost, Host, HostDeps, HostError, HostOption, PeerInfo,
};
pub use node::{Connectivity, Node, NodeConfig};
pub use patch::{
    encode_text, ErrorKind, PatchError, PatchOp, PatchOutput, PatchRequest, Patcher, ADD_LINK,
    FETCH_TIMEOUT, RM_LINK,
};
pub use routing::{
    DhtRouting, NilRouting, OfflineRouting, Routing, RoutingDeps, RoutingError, RoutingOption,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::builder::NodeBuilder;
    pub use crate::error::NodeError;
    pub use crate::node::{Connectivity, Node};
    pub use crate::patch::{encode_text, PatchError, Patcher, ADD_LINK, RM_LINK};
    pub use ipcs_dag::{Cid, DagNode, DagService};
    pub use tokio_util::sync::CancellationToken;
}
