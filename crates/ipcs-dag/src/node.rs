//! DAG node definition and builder.
//!
//! Each node in the Merkle-DAG contains:
//! - Opaque payload bytes
//! - An ordered list of named links to other nodes
//!
//! A node's identifier is never stored on the node; it is recomputed from
//! the canonical (CBOR) encoding of the current contents whenever asked.

use crate::cid::Cid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while encoding or decoding a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("failed to encode node: {0}")]
    Encode(String),

    #[error("failed to decode node: {0}")]
    Decode(String),
}

/// A named, sized pointer to another node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link name; not required to be unique within a node.
    pub name: String,

    /// Identifier of the target node.
    pub cid: Cid,

    /// Cumulative size of the target node and everything it links to.
    pub size: u64,
}

impl Link {
    pub fn new(name: impl Into<String>, cid: Cid, size: u64) -> Self {
        Link {
            name: name.into(),
            cid,
            size,
        }
    }
}

/// A node in the Merkle-DAG.
///
/// Field order is part of the canonical encoding; links come first so that
/// the encoding matches the conventional `{Links, Data}` layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    links: Vec<Link>,

    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

impl DagNode {
    /// Create an empty node.
    pub fn new() -> Self {
        DagNode::default()
    }

    /// Create a node carrying the given payload and no links.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        DagNode {
            links: Vec::new(),
            data: data.into(),
        }
    }

    /// The payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the payload bytes.
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }

    /// The link set, in stored order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// First link with the given name, if any.
    pub fn get_link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Number of links with the given name.
    pub fn count_links(&self, name: &str) -> usize {
        self.links.iter().filter(|l| l.name == name).count()
    }

    /// Append a link unconditionally.
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Append a link pointing at `child`, using its identifier and size.
    pub fn add_node_link(&mut self, name: impl Into<String>, child: &DagNode) -> Result<(), CodecError> {
        let link = Link::new(name, child.cid()?, child.size()?);
        self.links.push(link);
        Ok(())
    }

    /// Append a link pointing at `child` without duplicating an existing
    /// `(name, target)` pair.
    ///
    /// If a link with both the same name and the same target already
    /// exists, the first one keeps its position and any later copies are
    /// dropped, so re-adding an existing pair leaves the node unchanged.
    /// Otherwise the link is appended. Links that only share the name are
    /// left in place.
    pub fn add_node_link_clean(
        &mut self,
        name: impl Into<String>,
        child: &DagNode,
    ) -> Result<(), CodecError> {
        let link = Link::new(name, child.cid()?, child.size()?);
        let same = |l: &Link| l.name == link.name && l.cid == link.cid;

        match self.links.iter().position(same) {
            Some(first) => {
                let mut index = 0;
                self.links.retain(|l| {
                    let keep = index <= first || !same(l);
                    index += 1;
                    keep
                });
                self.links[first] = link;
            }
            None => self.links.push(link),
        }
        Ok(())
    }

    /// Remove every link with the given name, returning how many went.
    pub fn remove_link(&mut self, name: &str) -> usize {
        let before = self.links.len();
        self.links.retain(|l| l.name != name);
        before - self.links.len()
    }

    /// Canonical byte form.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Parse the canonical byte form.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Content identifier of the current contents.
    pub fn cid(&self) -> Result<Cid, CodecError> {
        Ok(Cid::hash(&self.encode()?))
    }

    /// Cumulative size: encoded length plus the sizes of all linked nodes.
    pub fn size(&self) -> Result<u64, CodecError> {
        let own = self.encode()?.len() as u64;
        Ok(self.links.iter().fold(own, |acc, l| acc.saturating_add(l.size)))
    }
}

/// Builder for creating DAG nodes.
#[derive(Clone, Debug, Default)]
pub struct DagNodeBuilder {
    links: Vec<Link>,
    data: Vec<u8>,
}

impl DagNodeBuilder {
    /// Create a new node builder.
    pub fn new() -> Self {
        DagNodeBuilder::default()
    }

    /// Set the payload.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Add a single link.
    pub fn with_link(mut self, name: impl Into<String>, cid: Cid, size: u64) -> Self {
        self.links.push(Link::new(name, cid, size));
        self
    }

    /// Set all links at once.
    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    pub fn build(self) -> DagNode {
        DagNode {
            links: self.links,
            data: self.data,
        }
    }
}
