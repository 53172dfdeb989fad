//! Node configuration record.

use crate::error::Result;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Address the node listens on when nothing else is configured.
pub const DEFAULT_SWARM_ADDRESS: &str = "/ip4/0.0.0.0/tcp/4001";

/// Well-known peers contacted when an online node starts.
pub const DEFAULT_BOOTSTRAP_ADDRESSES: &[&str] = &[
    "/ip4/104.131.131.82/tcp/4001/ipfs/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
    "/ip4/104.236.176.52/tcp/4001/ipfs/QmSoLnSGccFuZQJzRadHn95W2CrSFmZuTdDWP8HXaHca9z",
    "/ip4/104.236.179.241/tcp/4001/ipfs/QmSoLpPVmHKQ4XTPdz8tjDFgdeRFkpV8JgYq8CVJjQfRaR",
    "/ip4/162.243.248.213/tcp/4001/ipfs/QmSoLueR4xBeUbY9WZ9xGUUxunbKWcrNFTDAadQJmocnWm",
    "/ip4/128.199.219.111/tcp/4001/ipfs/QmSoLSafTMBsPKadTEgaXctDQVcqN88CNLHXMkTNwMKPnu",
    "/ip4/104.236.76.40/tcp/4001/ipfs/QmSoLV4Bbm51jM9C4gDYZQ9Cy3U6aXMJDAbzgu2fzaDs64",
    "/ip4/178.62.158.247/tcp/4001/ipfs/QmSoLer265NRgSp2LA3dPaeykiS1J6DifTC88f5uVQKNAd",
    "/ip4/178.62.61.185/tcp/4001/ipfs/QmSoLMeWqB7YGVLJN3pNLQpmmEk35v6wYtsMGLzSr5QBU3",
    "/ip4/104.236.151.122/tcp/4001/ipfs/QmSoLju6m7xTh3DuokvT3886QRYqxAzb1kShaanJgW36yx",
];

/// Network addresses of the node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Addresses {
    /// Listen addresses for peer connections.
    pub swarm: Vec<String>,
}

/// The configuration record held by a repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub identity: Identity,
    pub addresses: Addresses,
    pub bootstrap: Vec<String>,
}

impl Config {
    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Values filled into a synthesized repository's configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoDefaults {
    pub bootstrap: Vec<String>,
    pub swarm: Vec<String>,
}

impl Default for RepoDefaults {
    fn default() -> Self {
        Self {
            bootstrap: DEFAULT_BOOTSTRAP_ADDRESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            swarm: vec![DEFAULT_SWARM_ADDRESS.to_string()],
        }
    }
}

impl RepoDefaults {
    pub fn with_bootstrap(mut self, bootstrap: Vec<String>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_swarm(mut self, swarm: Vec<String>) -> Self {
        self.swarm = swarm;
        self
    }

    /// Compose a configuration for the given identity.
    pub fn config_for(&self, identity: Identity) -> Config {
        Config {
            identity,
            addresses: Addresses {
                swarm: self.swarm.clone(),
            },
            bootstrap: self.bootstrap.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepoError;

    #[test]
    fn test_defaults() {
        let defaults = RepoDefaults::default();
        assert_eq!(defaults.swarm, vec!["/ip4/0.0.0.0/tcp/4001".to_string()]);
        assert_eq!(defaults.bootstrap.len(), DEFAULT_BOOTSTRAP_ADDRESSES.len());
    }

    #[test]
    fn test_defaults_override() {
        let defaults = RepoDefaults::default()
            .with_bootstrap(vec![])
            .with_swarm(vec!["/ip4/127.0.0.1/tcp/0".to_string()]);

        let config = defaults.config_for(Identity::default());
        assert!(config.bootstrap.is_empty());
        assert_eq!(config.addresses.swarm, vec!["/ip4/127.0.0.1/tcp/0".to_string()]);
    }

    #[test]
    fn test_json_field_names() {
        let config = RepoDefaults::default().config_for(Identity {
            peer_id: "QmPeer".to_string(),
            priv_key: "a2V5".to_string(),
        });
        let json = config.to_json().unwrap();

        assert!(json.contains("\"Identity\""));
        assert!(json.contains("\"PeerID\": \"QmPeer\""));
        assert!(json.contains("\"PrivKey\""));
        assert!(json.contains("\"Swarm\""));
        assert!(json.contains("\"Bootstrap\""));

        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(Config::from_json("{"), Err(RepoError::Config(_))));
    }
}
