//! Repository trait, the in-memory repository and default synthesis.

use crate::config::{Config, RepoDefaults};
use crate::error::{RepoError, Result};
use crate::identity::Identity;
use ipcs_dag::{MapDatastore, MutexDatastore, ThreadSafeDatastore};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Identity, configuration and datastore backing a running node.
pub trait Repo: Send + Sync {
    /// A snapshot of the current configuration.
    fn config(&self) -> Config;

    /// Replace the configuration.
    fn set_config(&self, config: Config) -> Result<()>;

    /// The backing key-value store.
    fn datastore(&self) -> Arc<dyn ThreadSafeDatastore>;

    /// Release the repository. Further writes fail with `Closed`.
    fn close(&self) -> Result<()>;
}

/// A repository that lives entirely in memory.
pub struct MemoryRepo {
    config: RwLock<Config>,
    datastore: Arc<dyn ThreadSafeDatastore>,
    closed: AtomicBool,
}

impl MemoryRepo {
    /// A repository over a fresh mutex-guarded map datastore.
    pub fn new(config: Config) -> Self {
        Self::with_datastore(config, Arc::new(MutexDatastore::new(MapDatastore::new())))
    }

    pub fn with_datastore(config: Config, datastore: Arc<dyn ThreadSafeDatastore>) -> Self {
        Self {
            config: RwLock::new(config),
            datastore,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Repo for MemoryRepo {
    fn config(&self) -> Config {
        self.config.read().clone()
    }

    fn set_config(&self, config: Config) -> Result<()> {
        if self.is_closed() {
            return Err(RepoError::Closed);
        }
        *self.config.write() = config;
        Ok(())
    }

    fn datastore(&self) -> Arc<dyn ThreadSafeDatastore> {
        self.datastore.clone()
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(RepoError::Closed);
        }
        debug!("memory repo closed");
        Ok(())
    }
}

/// Synthesize an ephemeral repository with the built-in defaults.
pub fn default_repo() -> Result<Arc<dyn Repo>> {
    default_repo_with(&RepoDefaults::default())
}

/// Synthesize an ephemeral repository: a fresh identity, the given
/// address defaults, and an in-memory datastore.
pub fn default_repo_with(defaults: &RepoDefaults) -> Result<Arc<dyn Repo>> {
    let identity = Identity::generate()?;
    let config = defaults.config_for(identity);

    info!(peer_id = %config.identity.peer_id, "synthesized default repository");
    Ok(Arc::new(MemoryRepo::new(config)))
}
