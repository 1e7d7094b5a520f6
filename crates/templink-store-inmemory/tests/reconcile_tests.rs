use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use templink_core::{
    application::{tag_service::TagReconciler, value_map_service::ValueMapService},
    context::RequestContext,
    domain::entity::{EntityId, Mapping, Tag, ValueMapId, ValueMapInput},
    error::LinkageError,
};
use templink_store_inmemory::{InMemoryStore, RecordingAuditSink};

// Helpers

fn context(store: &InMemoryStore) -> RequestContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("templink_core=debug,templink_store_inmemory=debug")
        .try_init();
    RequestContext::new(Arc::new(store.clone()), Arc::new(RecordingAuditSink::new()))
}

fn tag_reconciler(store: &InMemoryStore) -> TagReconciler {
    TagReconciler::new(Arc::new(store.clone()))
}

fn value_map_service(store: &InMemoryStore) -> ValueMapService {
    ValueMapService::new(Arc::new(store.clone()))
}

fn desired(target: u64, tags: &[(&str, &str)]) -> BTreeMap<EntityId, Vec<Tag>> {
    let mut map = BTreeMap::new();
    map.insert(
        EntityId(target),
        tags.iter().map(|(t, v)| Tag::new(*t, *v)).collect(),
    );
    map
}

fn value_map(name: &str, mappings: &[(&str, &str)]) -> ValueMapInput {
    ValueMapInput::new(
        name,
        mappings.iter().map(|(k, d)| Mapping::new(*k, *d)).collect(),
    )
}

#[tokio::test]
async fn test_reconcile_inserts_missing_and_deletes_leftover_tags() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let reconciler = tag_reconciler(&store);

    reconciler
        .reconcile(&ctx, &desired(5, &[("env", "prod"), ("team", "infra")]))
        .await
        .unwrap();
    reconciler
        .reconcile(&ctx, &desired(5, &[("env", "prod"), ("tier", "web")]))
        .await
        .unwrap();

    let rows = store.tag_rows().await;
    let summary: Vec<(u64, &str, &str)> = rows
        .iter()
        .map(|row| (row.id.0, row.tag.as_str(), row.value.as_str()))
        .collect();

    // The matching ("env", "prod") row keeps its row id.
    assert_eq!(summary, vec![(1, "env", "prod"), (3, "tier", "web")]);
}

#[tokio::test]
async fn test_reconcile_to_same_state_changes_nothing() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let reconciler = tag_reconciler(&store);
    let state = desired(5, &[("env", "prod"), ("team", "infra")]);

    reconciler.reconcile(&ctx, &state).await.unwrap();
    let before = store.tag_rows().await;

    reconciler.reconcile(&ctx, &state).await.unwrap();
    let after = store.tag_rows().await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_reconcile_empty_list_deletes_every_tag() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let reconciler = tag_reconciler(&store);

    reconciler
        .reconcile(&ctx, &desired(5, &[("env", "prod")]))
        .await
        .unwrap();
    reconciler.reconcile(&ctx, &desired(5, &[])).await.unwrap();

    assert!(store.tag_rows().await.is_empty());
}

#[tokio::test]
async fn test_reconcile_leaves_unlisted_targets_untouched() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;
    store.add_host(EntityId(6), "web-02").await;

    let ctx = context(&store);
    let reconciler = tag_reconciler(&store);

    reconciler
        .reconcile(&ctx, &desired(5, &[("env", "prod")]))
        .await
        .unwrap();
    reconciler
        .reconcile(&ctx, &desired(6, &[("env", "qa")]))
        .await
        .unwrap();

    // Clearing web-01 must not disturb web-02.
    reconciler.reconcile(&ctx, &desired(5, &[])).await.unwrap();

    let rows = store.tag_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target_id, EntityId(6));
    assert_eq!(rows[0].value, "qa");
}

#[tokio::test]
async fn test_reconcile_rejects_duplicate_desired_pair() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let reconciler = tag_reconciler(&store);

    let err = reconciler
        .reconcile(&ctx, &desired(5, &[("env", "prod"), ("env", "prod")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LinkageError::ValidationFailed(_)));
    assert!(store.tag_rows().await.is_empty(), "rejected call must not write");
}

#[tokio::test]
async fn test_reconcile_rejects_over_length_value() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let long = "x".repeat(256);
    let err = tag_reconciler(&store)
        .reconcile(&ctx, &desired(5, &[("env", long.as_str())]))
        .await
        .unwrap_err();

    assert!(matches!(err, LinkageError::ValidationFailed(_)));
    assert!(err.to_string().contains("exceeds 255 characters"));
}

#[tokio::test]
async fn test_create_tags_inserts_rows() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    tag_reconciler(&store)
        .create_tags(&ctx, &desired(5, &[("env", "prod"), ("team", "infra")]))
        .await
        .unwrap();

    let rows = store.tag_rows().await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.target_id == EntityId(5)));
}

#[tokio::test]
async fn test_replace_value_maps_assigns_fresh_ids() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let maps_service = value_map_service(&store);
    let input = vec![value_map("Service state", &[("0", "Down"), ("1", "Up")])];

    let first = maps_service.replace(&ctx, EntityId(5), &input).await.unwrap();
    assert_eq!(first, vec![ValueMapId(1)]);

    // Replacing with identical content still rewrites the rows.
    let second = maps_service.replace(&ctx, EntityId(5), &input).await.unwrap();
    assert_eq!(second, vec![ValueMapId(2)]);

    let stored = maps_service.value_maps(&ctx, &[EntityId(5)]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, ValueMapId(2));
    assert_eq!(stored[0].name, "Service state");
    assert_eq!(stored[0].mappings, vec![Mapping::new("0", "Down"), Mapping::new("1", "Up")]);
}

#[tokio::test]
async fn test_replace_with_empty_set_removes_every_map() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let maps_service = value_map_service(&store);

    maps_service
        .replace(&ctx, EntityId(5), &[value_map("Service state", &[("0", "Down")])])
        .await
        .unwrap();
    maps_service.replace(&ctx, EntityId(5), &[]).await.unwrap();

    assert!(maps_service.value_maps(&ctx, &[EntityId(5)]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_rejects_duplicate_names_and_keeps_state() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let maps_service = value_map_service(&store);

    maps_service
        .replace(&ctx, EntityId(5), &[value_map("Service state", &[("0", "Down")])])
        .await
        .unwrap();

    let err = maps_service
        .replace(
            &ctx,
            EntityId(5),
            &[
                value_map("Backup state", &[("0", "Idle")]),
                value_map("Backup state", &[("1", "Running")]),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LinkageError::ValidationFailed(_)));
    let stored = maps_service.value_maps(&ctx, &[EntityId(5)]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Service state", "stored maps must survive a rejected replace");
}

#[tokio::test]
async fn test_replace_rejects_map_without_mappings() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;

    let ctx = context(&store);
    let err = value_map_service(&store)
        .replace(&ctx, EntityId(5), &[value_map("Service state", &[])])
        .await
        .unwrap_err();

    assert!(matches!(err, LinkageError::ValidationFailed(_)));
    assert!(err.to_string().contains("mappings cannot be empty"));
}

#[tokio::test]
async fn test_value_maps_are_scoped_to_requested_targets() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;
    store.add_host(EntityId(6), "web-02").await;

    let ctx = context(&store);
    let maps_service = value_map_service(&store);

    maps_service
        .replace(&ctx, EntityId(5), &[value_map("Service state", &[("0", "Down")])])
        .await
        .unwrap();
    maps_service
        .replace(&ctx, EntityId(6), &[value_map("Backup state", &[("0", "Idle")])])
        .await
        .unwrap();

    let stored = maps_service.value_maps(&ctx, &[EntityId(5)]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].target_id, EntityId(5));
}

#[tokio::test]
async fn test_delete_value_maps_clears_only_given_targets() {
    let store = InMemoryStore::new();
    store.add_host(EntityId(5), "web-01").await;
    store.add_host(EntityId(6), "web-02").await;

    let ctx = context(&store);
    let maps_service = value_map_service(&store);

    maps_service
        .replace(&ctx, EntityId(5), &[value_map("Service state", &[("0", "Down")])])
        .await
        .unwrap();
    maps_service
        .replace(&ctx, EntityId(6), &[value_map("Backup state", &[("0", "Idle")])])
        .await
        .unwrap();

    maps_service.delete_value_maps(&ctx, &[EntityId(5)]).await.unwrap();

    assert!(maps_service.value_maps(&ctx, &[EntityId(5)]).await.unwrap().is_empty());
    assert_eq!(maps_service.value_maps(&ctx, &[EntityId(6)]).await.unwrap().len(), 1);
}
