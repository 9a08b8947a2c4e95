//! Integration tests for reacting to enablement changes after the build.

mod common;

use std::sync::Arc;

use common::{child_labels, contributors, root_labels, TestContributor};
use navcompose::application::services::TreeCompositionEngine;
use navcompose::application::ContributorRegistry;
use navcompose::config::FailurePolicy;

fn engine(list: &[&Arc<TestContributor>]) -> TreeCompositionEngine {
    TreeCompositionEngine::new(
        ContributorRegistry::new(contributors(list)),
        FailurePolicy::Isolate,
    )
}

#[tokio::test]
async fn given_contributor_enabled_later_when_reconciling_then_mounted_at_sorted_position() {
    // Arrange
    let a = TestContributor::new("a", 0).with_children(&["a1"]).arc();
    let mail = TestContributor::new("mail", 1).disabled().arc();
    let c = TestContributor::new("c", 2).arc();
    let engine = engine(&[&a, &mail, &c]);
    engine.build_tree().await.expect("build");
    engine.refresh_all_nodes().await.expect("refresh");
    let a_before = engine.contributor_roots("a");

    // Act
    mail.set_enabled(true);
    let report = engine.reconcile_enablement().await.expect("reconcile");

    // Assert
    assert_eq!(report.mounted, vec!["mail"]);
    assert!(report.unmounted.is_empty());
    assert_eq!(root_labels(&engine.portfolio_trees()), vec!["A", "MAIL", "C"]);
    assert_eq!(engine.contributor_roots("a"), a_before);
}

#[tokio::test]
async fn given_contributor_disabled_later_when_reconciling_then_only_it_unmounted() {
    let a = TestContributor::new("a", 0).arc();
    let b = TestContributor::new("b", 1).with_children(&["b1"]).arc();
    let c = TestContributor::new("c", 2).with_children(&["c1"]).refresh_on("x").arc();
    let engine = engine(&[&a, &b, &c]);
    engine.build_tree().await.expect("build");
    engine.refresh_all_nodes().await.expect("refresh");
    let b_root = engine.contributor_roots("b")[0].key;

    b.set_enabled(false);
    let report = engine.reconcile_enablement().await.expect("reconcile");

    assert_eq!(report.unmounted, vec!["b"]);
    assert_eq!(root_labels(&engine.portfolio_trees()), vec!["A", "C"]);
    assert!(engine.node(b_root).is_none());
    // c's mount still resolves to c
    assert_eq!(child_labels(&engine.contributor_roots("c")[0]), vec!["c1"]);
}

#[tokio::test]
async fn given_disabled_then_reenabled_when_refreshing_then_targets_stay_with_owner() {
    let a = TestContributor::new("a", 0).with_children(&["a1"]).arc();
    let b = TestContributor::new("b", 1).with_children(&["b1"]).arc();
    let engine = engine(&[&a, &b]);
    engine.build_tree().await.expect("build");

    a.set_enabled(false);
    engine.reconcile_enablement().await.expect("disable");
    a.set_enabled(true);
    engine.reconcile_enablement().await.expect("enable");
    engine.refresh_all_nodes().await.expect("refresh");

    let roots = engine.portfolio_trees();
    assert_eq!(root_labels(&roots), vec!["A", "B"]);
    assert_eq!(child_labels(&roots[0]), vec!["a1"]);
    assert_eq!(child_labels(&roots[1]), vec!["b1"]);
}

#[tokio::test]
async fn given_no_change_when_reconciling_then_empty_report() {
    let a = TestContributor::new("a", 0).arc();
    let engine = engine(&[&a]);
    engine.build_tree().await.expect("build");

    let report = engine.reconcile_enablement().await.expect("reconcile");

    assert!(report.is_empty());
    assert_eq!(root_labels(&engine.portfolio_trees()), vec!["A"]);
}

#[tokio::test]
async fn given_unbuilt_engine_when_reconciling_then_nothing_mounted() {
    let a = TestContributor::new("a", 0).arc();
    let engine = engine(&[&a]);

    let report = engine.reconcile_enablement().await.expect("reconcile");

    assert!(report.is_empty());
    assert!(engine.portfolio_trees().is_empty());
}

#[tokio::test]
async fn given_contributor_enabled_later_when_reconciling_then_refreshed_after_mounting() {
    // Arrange: roots come back shallow, children only arrive on refresh
    let mail = TestContributor::new("mail", 0)
        .with_children(&["Inbox"])
        .disabled()
        .arc();
    let engine = engine(&[&mail]);
    engine.build_tree().await.expect("build");

    // Act
    mail.set_enabled(true);
    let report = engine.reconcile_enablement().await.expect("reconcile");

    // Assert
    assert_eq!(report.refreshed, vec!["mail"]);
    assert_eq!(mail.refresh_count(), 1);
    assert_eq!(child_labels(&engine.contributor_roots("mail")[0]), vec!["Inbox"]);
}

#[tokio::test]
async fn given_refresh_on_mount_off_when_reconciling_then_mounted_without_refresh() {
    let mail = TestContributor::new("mail", 0)
        .with_children(&["Inbox"])
        .disabled()
        .arc();
    let engine = TreeCompositionEngine::new(
        ContributorRegistry::new(contributors(&[&mail])),
        FailurePolicy::Isolate,
    )
    .with_refresh_on_mount(false);
    engine.build_tree().await.expect("build");

    mail.set_enabled(true);
    let report = engine.reconcile_enablement().await.expect("reconcile");

    assert_eq!(report.mounted, vec!["mail"]);
    assert!(report.refreshed.is_empty());
    assert_eq!(mail.refresh_count(), 0);
    assert!(engine.contributor_roots("mail")[0].children.is_empty());
}
