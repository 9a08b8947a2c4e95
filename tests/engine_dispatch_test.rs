//! Integration tests for first-match dispatch of menus, drops and deletes.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{contributors, TestContributor};
use navcompose::application::services::TreeCompositionEngine;
use navcompose::application::ContributorRegistry;
use navcompose::config::FailurePolicy;
use navcompose::domain::{DataPayload, NodeKey};

async fn built(list: &[&Arc<TestContributor>]) -> TreeCompositionEngine {
    let engine = TreeCompositionEngine::new(
        ContributorRegistry::new(contributors(list)),
        FailurePolicy::Isolate,
    );
    engine.build_tree().await.expect("build");
    engine.refresh_all_nodes().await.expect("refresh");
    engine
}

fn root_of(engine: &TreeCompositionEngine, name: &str) -> NodeKey {
    engine.contributor_roots(name)[0].key
}

fn menu_labels(items: Option<Vec<navcompose::domain::MenuItem>>) -> Option<Vec<String>> {
    items.map(|items| items.into_iter().map(|i| i.label).collect())
}

// ============================================================
// Context menu
// ============================================================

#[tokio::test]
async fn given_first_contributor_declines_when_asking_menu_then_next_one_answers() {
    // Arrange: a has no menu at all, b owns the node type
    let a = TestContributor::new("a", 0).arc();
    let b = TestContributor::new("b", 1).with_menu("b_root", &["New watchlist"]).arc();
    let engine = built(&[&a, &b]).await;

    // Act
    let items = engine.context_menu_items(root_of(&engine, "b"), None);

    // Assert
    assert_eq!(menu_labels(items), Some(vec!["New watchlist".to_string()]));
}

#[tokio::test]
async fn given_two_contributors_claim_node_when_asking_menu_then_first_wins_without_merging() {
    let first = TestContributor::new("first", 0).with_menu("first_root", &["Edit"]).arc();
    let second = TestContributor::new("second", 1)
        .with_menu("first_root", &["Delete", "Rename"])
        .arc();
    let engine = built(&[&first, &second]).await;

    let items = engine.context_menu_items(root_of(&engine, "first"), None);

    assert_eq!(menu_labels(items), Some(vec!["Edit".to_string()]));
}

#[tokio::test]
async fn given_empty_menu_from_first_when_asking_then_skipped_for_next() {
    let empty = TestContributor::new("empty", 0).with_menu("owner_root", &[]).arc();
    let owner = TestContributor::new("owner", 1).with_menu("owner_root", &["Open"]).arc();
    let engine = built(&[&empty, &owner]).await;

    let items = engine.context_menu_items(root_of(&engine, "owner"), None);

    assert_eq!(menu_labels(items), Some(vec!["Open".to_string()]));
}

#[tokio::test]
async fn given_nobody_claims_node_when_asking_menu_then_none() {
    let a = TestContributor::new("a", 0).arc();
    let engine = built(&[&a]).await;

    assert!(engine.context_menu_items(root_of(&engine, "a"), None).is_none());
}

#[tokio::test]
async fn given_child_node_when_asking_menu_then_item_type_dispatched() {
    let a = TestContributor::new("a", 0)
        .with_children(&["a1"])
        .with_menu("a_item", &["Edit item"])
        .arc();
    let engine = built(&[&a]).await;
    let child = engine.contributor_roots("a")[0].children[0].key;

    let items = engine.context_menu_items(child, Some(child));

    assert_eq!(menu_labels(items), Some(vec!["Edit item".to_string()]));
}

// ============================================================
// Drag and drop
// ============================================================

#[tokio::test]
async fn given_one_contributor_accepts_kind_when_dropping_then_only_it_handles() {
    let a = TestContributor::new("a", 0).accepts_drop("portfolio").arc();
    let b = TestContributor::new("b", 1).accepts_drop("security").arc();
    let c = TestContributor::new("c", 2).accepts_drop("security").arc();
    let engine = built(&[&a, &b, &c]).await;
    let target = root_of(&engine, "c");
    let payload = DataPayload::new("security", json!({ "isin": "US0378331005" }));

    assert!(engine.can_drop(target, &payload));
    let handled = engine
        .handle_drop(target, &payload, Some("Tech"))
        .await
        .expect("drop");

    assert!(handled);
    assert!(a.dropped().is_empty());
    assert_eq!(b.dropped(), vec!["C"]);
    assert!(c.dropped().is_empty());
}

#[tokio::test]
async fn given_no_taker_when_dropping_then_false() {
    let a = TestContributor::new("a", 0).accepts_drop("portfolio").arc();
    let engine = built(&[&a]).await;
    let target = root_of(&engine, "a");
    let payload = DataPayload::new("security", json!(null));

    assert!(!engine.can_drop(target, &payload));
    assert!(!engine.handle_drop(target, &payload, None).await.expect("drop"));
    assert!(a.dropped().is_empty());
}

// ============================================================
// Delete
// ============================================================

#[tokio::test]
async fn given_owner_of_node_type_when_deleting_then_owner_runs_delete() {
    let a = TestContributor::new("a", 0).deletes("b_item").arc();
    let b = TestContributor::new("b", 1)
        .with_children(&["Tech"])
        .deletes("b_item")
        .arc();
    let engine = built(&[&a, &b]).await;
    let child = engine.contributor_roots("b")[0].children[0].key;

    let deleted = engine.handle_delete(child, "Tech").await.expect("delete");

    assert!(deleted);
    assert_eq!(a.deleted(), vec!["Tech"]);
    assert!(b.deleted().is_empty());
}

#[tokio::test]
async fn given_unclaimed_node_when_deleting_then_false() {
    let a = TestContributor::new("a", 0).arc();
    let engine = built(&[&a]).await;

    let deleted = engine
        .handle_delete(root_of(&engine, "a"), "1")
        .await
        .expect("delete");

    assert!(!deleted);
}

#[tokio::test]
async fn given_removed_node_when_dispatching_then_misses_quietly() {
    let a = TestContributor::new("a", 0)
        .with_menu("a_root", &["Edit"])
        .accepts_drop("security")
        .arc();
    let engine = built(&[&a]).await;
    let stale = root_of(&engine, "a");
    engine.build_tree().await.expect("rebuild");

    assert!(engine.context_menu_items(stale, None).is_none());
    assert!(!engine.can_drop(stale, &DataPayload::new("security", json!(null))));
    assert!(!engine.handle_delete(stale, "1").await.expect("delete"));
}
