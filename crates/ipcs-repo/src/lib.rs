//! # ipcs-repo
//!
//! Repository layer for the IPCS node: the configuration record, the node
//! identity, and the `Repo` trait with an in-memory implementation.
//!
//! When a node is started without a repository, [`default_repo`] synthesizes
//! one with a freshly generated identity, the well-known bootstrap list, the
//! default listen address and an in-memory datastore.
//!
//! ```rust
//! use ipcs_repo::{default_repo, DEFAULT_SWARM_ADDRESS};
//!
//! let repo = default_repo().unwrap();
//! let config = repo.config();
//! assert_eq!(config.addresses.swarm, vec![DEFAULT_SWARM_ADDRESS.to_string()]);
//! assert!(config.identity.signing_key().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod repo;

pub use config::{
    Addresses, Config, RepoDefaults, DEFAULT_BOOTSTRAP_ADDRESSES, DEFAULT_SWARM_ADDRESS,
};
pub use error::{RepoError, Result};
pub use identity::{time_seeded_rng, Identity, PeerId};
pub use repo::{default_repo, default_repo_with, MemoryRepo, Repo};
