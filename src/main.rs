use anyhow::{Context, Result};
use futures::future::try_join_all;
use ipcs_core::prelude::*;
use ipcs_core::PatchOutput;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let ctx = CancellationToken::new();
    let node = NodeBuilder::new()
        .offline()
        .build(&ctx)
        .await
        .context("failed to build node")?;
    info!(peer_id = %node.peer_id(), "node ready");

    let dag = node.dag();
    let root = dag.add(&DagNode::with_data(b"demo directory".to_vec())).await?;
    let files = try_join_all(
        ["readme", "license", "notes"]
            .iter()
            .map(|name| async move { dag.add(&DagNode::with_data(name.as_bytes().to_vec())).await }),
    )
    .await?;

    println!("root:");
    print!("{}", PatchOutput::from(root));

    let mut current = root;
    for (name, file) in ["readme", "license", "notes"].iter().zip(&files) {
        let child = file.to_base58();
        current = node
            .patch(&ctx, &current.to_base58(), ADD_LINK, &[*name, child.as_str()])
            .await
            .with_context(|| format!("add-link {} failed", name))?;
        print!("add-link {}: {}", name, PatchOutput::from(current));
    }

    current = node
        .patch(&ctx, &current.to_base58(), RM_LINK, &["license"])
        .await
        .context("rm-link failed")?;
    print!("rm-link license: {}", encode_text(&current));

    // The original root is still there, unchanged.
    let original = dag.get(&root).await?;
    info!(links = original.links().len(), "original root untouched");

    match node.patch(&ctx, "not-base58!!", RM_LINK, &["x"]).await {
        Err(e) if e.is_usage() => info!(error = %e, "usage error reported before any store access"),
        other => anyhow::bail!("expected a usage error, got {:?}", other),
    }

    node.close().await?;
    Ok(())
}
