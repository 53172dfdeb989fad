//! End-to-end tests: build a node, store objects, patch them.

use ipcs_core::prelude::*;
use ipcs_core::{PatchRequest, RoutingOption};
use ipcs_dag::{DagNodeBuilder, Link};
use ipcs_repo::RepoDefaults;
use proptest::prelude::*;

async fn offline_node() -> Node {
    let ctx = CancellationToken::new();
    let mut builder = NodeBuilder::new();
    builder
        .offline()
        .set_repo_defaults(RepoDefaults::default().with_bootstrap(Vec::new()));
    builder.build(&ctx).await.unwrap()
}

#[tokio::test]
async fn test_builder_is_single_use() {
    let ctx = CancellationToken::new();
    let mut builder = NodeBuilder::new();
    builder.online().set_routing(RoutingOption::Nil);
    builder.set_repo_defaults(RepoDefaults::default().with_bootstrap(Vec::new()));

    let node = builder.build(&ctx).await.unwrap();
    assert!(node.is_online());
    assert!(matches!(
        builder.build(&ctx).await,
        Err(NodeError::AlreadyBuilt)
    ));
}

#[tokio::test]
async fn test_add_then_remove_restores_root() {
    let ctx = CancellationToken::new();
    let node = offline_node().await;

    let root = node.dag().add(&DagNode::with_data(b"dir".to_vec())).await.unwrap();
    let file = node.dag().add(&DagNode::with_data(b"file".to_vec())).await.unwrap();

    let file_text = file.to_base58();
    let with_file = node
        .patch(&ctx, &root.to_base58(), ADD_LINK, &["a.txt", file_text.as_str()])
        .await
        .unwrap();
    let without = node
        .patch(&ctx, &with_file.to_base58(), RM_LINK, &["a.txt"])
        .await
        .unwrap();

    assert_ne!(with_file, root);
    assert_eq!(without, root);
}

#[tokio::test]
async fn test_patch_chain_builds_tree() {
    let ctx = CancellationToken::new();
    let node = offline_node().await;
    let dag = node.dag();

    let mut current = dag.add(&DagNode::new()).await.unwrap();
    let mut children = Vec::new();
    for i in 0..5 {
        let child = dag
            .add(&DagNode::with_data(format!("child {}", i).into_bytes()))
            .await
            .unwrap();
        let name = format!("c{}", i);
        let child_text = child.to_base58();
        current = node
            .patch(&ctx, &current.to_base58(), ADD_LINK, &[name.as_str(), child_text.as_str()])
            .await
            .unwrap();
        children.push((name, child));
    }

    let tree = dag.get(&current).await.unwrap();
    let names: Vec<_> = tree.links().iter().map(|l| l.name.clone()).collect();
    assert_eq!(names, vec!["c0", "c1", "c2", "c3", "c4"]);
    for (name, cid) in children {
        assert_eq!(tree.get_link(&name).unwrap().cid, cid);
    }
}

#[tokio::test]
async fn test_rm_link_removes_every_match() {
    let ctx = CancellationToken::new();
    let node = offline_node().await;

    let root = DagNodeBuilder::new()
        .with_link("dup", Cid::hash(b"a"), 1)
        .with_link("other", Cid::hash(b"b"), 2)
        .with_link("dup", Cid::hash(b"c"), 3)
        .build();
    let root_cid = node.dag().add(&root).await.unwrap();

    let patched = node
        .patch(&ctx, &root_cid.to_base58(), RM_LINK, &["dup"])
        .await
        .unwrap();

    let node_after = node.dag().get(&patched).await.unwrap();
    assert_eq!(node_after.links(), &[Link::new("other", Cid::hash(b"b"), 2)]);
}

#[tokio::test]
async fn test_missing_child_is_operational() {
    let ctx = CancellationToken::new();
    let node = offline_node().await;
    let root = node.dag().add(&DagNode::new()).await.unwrap();
    let ghost = Cid::hash(b"ghost").to_base58();

    let err = node
        .patch(&ctx, &root.to_base58(), ADD_LINK, &["g", ghost.as_str()])
        .await
        .unwrap_err();
    assert!(!err.is_usage());
    assert_eq!(node.dag().cids().unwrap(), vec![root]);
}

#[tokio::test]
async fn test_execute_parsed_request() {
    let ctx = CancellationToken::new();
    let node = offline_node().await;
    let root = node.dag().add(&DagNode::with_data(b"r".to_vec())).await.unwrap();

    let request = PatchRequest::from_args(&[root.to_base58().as_str(), RM_LINK, "x"]).unwrap();
    let cid = node.patcher().execute(&ctx, request).await.unwrap();
    assert_eq!(encode_text(&cid), format!("{}\n", root));
}

proptest! {
    #[test]
    fn prop_rm_link_matches_local_edit(
        names in prop::collection::vec("[a-c]", 0..8),
        target in "[a-d]",
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = CancellationToken::new();
            let node = offline_node().await;

            let mut builder = DagNodeBuilder::new().with_data(b"p".to_vec());
            for (i, name) in names.iter().enumerate() {
                builder = builder.with_link(name.as_str(), Cid::hash(&[i as u8]), i as u64);
            }
            let mut local = builder.build();
            let root = node.dag().add(&local).await.unwrap();

            let patched = node
                .patch(&ctx, &root.to_base58(), RM_LINK, &[target.as_str()])
                .await
                .unwrap();

            local.remove_link(&target);
            assert_eq!(patched, local.cid().unwrap());
            assert_eq!(node.dag().get(&patched).await.unwrap(), local);
        });
    }
}
