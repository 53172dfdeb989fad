//! Object patching: derive a new DAG node from an existing one by editing
//! its link set.
//!
//! A patch is a single linear sequence. The root is fetched, the edit is
//! applied to the in-memory copy, and the result is committed with one
//! `add`. Nothing is written before that final add, so a failed patch
//! leaves the store untouched and the original root stays resolvable.
//!
//! Text arguments are parsed into a [`PatchRequest`] before any store
//! access, which keeps every usage error ahead of the first fetch.

use ipcs_dag::{Cid, CidError, DagError, DagNode, DagService};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deadline applied to every individual store fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub const ADD_LINK: &str = "add-link";
pub const RM_LINK: &str = "rm-link";

/// Whether an error came from a malformed request or from doing the work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request. Nothing was read or written.
    Client,
    /// Store failure, deadline or cancellation.
    Normal,
}

/// Error type for patch operations.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid root identifier {input:?}: {source}")]
    InvalidRoot {
        input: String,
        #[source]
        source: CidError,
    },

    #[error("invalid child identifier {input:?}: {source}")]
    InvalidChild {
        input: String,
        #[source]
        source: CidError,
    },

    #[error("not enough arguments for {command}: expected {expected}, got {actual}")]
    NotEnoughArguments {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error("too many arguments for {command}: expected {expected}, got {actual}")]
    TooManyArguments {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error("unrecognized patch command {0:?}")]
    UnrecognizedCommand(String),

    #[error("timed out fetching {0}")]
    Timeout(Cid),

    #[error("patch cancelled")]
    Cancelled,

    #[error(transparent)]
    Dag(#[from] DagError),
}

impl PatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::InvalidRoot { .. }
            | PatchError::InvalidChild { .. }
            | PatchError::NotEnoughArguments { .. }
            | PatchError::TooManyArguments { .. }
            | PatchError::UnrecognizedCommand(_) => ErrorKind::Client,
            PatchError::Timeout(_) | PatchError::Cancelled | PatchError::Dag(_) => {
                ErrorKind::Normal
            }
        }
    }

    /// True for errors a dispatch layer should report as bad usage.
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Client
    }
}

/// A link edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOp {
    /// Link `child` under `name`, without duplicating an identical link.
    AddLink { name: String, child: Cid },
    /// Drop every link called `name`.
    RmLink { name: String },
}

impl PatchOp {
    pub fn command(&self) -> &'static str {
        match self {
            PatchOp::AddLink { .. } => ADD_LINK,
            PatchOp::RmLink { .. } => RM_LINK,
        }
    }
}

/// A parsed patch request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchRequest {
    pub root: Cid,
    pub op: PatchOp,
}

impl PatchRequest {
    /// Parse a root identifier, a command name and the command's arguments.
    ///
    /// `add-link` takes `[name, child]`, `rm-link` takes `[name]`.
    pub fn parse<S: AsRef<str>>(
        root: &str,
        command: &str,
        args: &[S],
    ) -> Result<Self, PatchError> {
        let root = Cid::from_base58(root).map_err(|source| PatchError::InvalidRoot {
            input: root.to_string(),
            source,
        })?;

        let op = match command {
            ADD_LINK => {
                let [name, child] = exact_args::<S, 2>(command, args)?;
                let child = Cid::from_base58(child).map_err(|source| PatchError::InvalidChild {
                    input: child.to_string(),
                    source,
                })?;
                PatchOp::AddLink {
                    name: name.to_string(),
                    child,
                }
            }
            RM_LINK => {
                let [name] = exact_args::<S, 1>(command, args)?;
                PatchOp::RmLink {
                    name: name.to_string(),
                }
            }
            other => return Err(PatchError::UnrecognizedCommand(other.to_string())),
        };

        Ok(PatchRequest { root, op })
    }

    /// Parse the full positional form `[root, command, args...]`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, PatchError> {
        match args {
            [root, command, rest @ ..] => Self::parse(root.as_ref(), command.as_ref(), rest),
            _ => Err(PatchError::NotEnoughArguments {
                command: "patch".to_string(),
                expected: 2,
                actual: args.len(),
            }),
        }
    }
}

fn exact_args<'a, S: AsRef<str>, const N: usize>(
    command: &str,
    args: &'a [S],
) -> Result<[&'a str; N], PatchError> {
    if args.len() < N {
        return Err(PatchError::NotEnoughArguments {
            command: command.to_string(),
            expected: N,
            actual: args.len(),
        });
    }
    if args.len() > N {
        return Err(PatchError::TooManyArguments {
            command: command.to_string(),
            expected: N,
            actual: args.len(),
        });
    }
    Ok(std::array::from_fn(|i| args[i].as_ref()))
}

/// Text form of a patch result: the base-58 identifier and a newline.
pub fn encode_text(cid: &Cid) -> String {
    format!("{}\n", cid.to_base58())
}

/// The result of a patch, displayed in its text encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchOutput {
    pub cid: Cid,
}

impl From<Cid> for PatchOutput {
    fn from(cid: Cid) -> Self {
        PatchOutput { cid }
    }
}

impl fmt::Display for PatchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_text(&self.cid))
    }
}

/// Applies link edits against a DAG service.
#[derive(Clone)]
pub struct Patcher {
    dag: Arc<dyn DagService>,
    fetch_timeout: Duration,
}

impl Patcher {
    pub fn new(dag: Arc<dyn DagService>) -> Self {
        Self {
            dag,
            fetch_timeout: FETCH_TIMEOUT,
        }
    }

    /// Override the per-fetch deadline.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Parse and run a patch, returning the identifier of the new root.
    pub async fn patch<S: AsRef<str>>(
        &self,
        ctx: &CancellationToken,
        root: &str,
        command: &str,
        args: &[S],
    ) -> Result<Cid, PatchError> {
        let request = PatchRequest::parse(root, command, args)?;
        self.execute(ctx, request).await
    }

    /// Run a parsed patch request.
    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        request: PatchRequest,
    ) -> Result<Cid, PatchError> {
        let mut root = self.fetch(ctx, &request.root).await?;

        match &request.op {
            PatchOp::AddLink { name, child } => {
                let child_node = self.fetch(ctx, child).await?;
                root.add_node_link_clean(name.as_str(), &child_node)
                    .map_err(DagError::from)?;
            }
            PatchOp::RmLink { name } => {
                let removed = root.remove_link(name);
                debug!(%name, removed, "links removed");
            }
        }

        let cid = self.commit(ctx, &root).await?;
        debug!(
            command = request.op.command(),
            from = %request.root.short(),
            to = %cid.short(),
            "patch committed"
        );
        Ok(cid)
    }

    async fn fetch(&self, ctx: &CancellationToken, cid: &Cid) -> Result<DagNode, PatchError> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(PatchError::Cancelled),
            res = tokio::time::timeout(self.fetch_timeout, self.dag.get(cid)) => match res {
                Ok(node) => Ok(node?),
                Err(_) => Err(PatchError::Timeout(*cid)),
            },
        }
    }

    async fn commit(&self, ctx: &CancellationToken, node: &DagNode) -> Result<Cid, PatchError> {
        if ctx.is_cancelled() {
            return Err(PatchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(PatchError::Cancelled),
            res = self.dag.add(node) => Ok(res?),
        }
    }
}
