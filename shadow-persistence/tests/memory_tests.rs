use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shadow_merge::{mergeable_record, Managed};
use shadow_model::{Model, Shape, TypedShape};
use shadow_persistence::{
    Context, DeleteOp, ErrorKind, ListOptions, MemoryPersistence, Persistence, PersistenceError, ReadOp,
    StoredModel, WriteOp,
};
use shadow_types::{EntityKey, ModelKind, PersistenceId, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Lamp {
    on: Managed<bool>,
    brightness: Managed<u8>,
}

mergeable_record!(Lamp { on, brightness });

fn shape() -> Shape {
    TypedShape::<Lamp>::shared("lamp")
}

fn lamp(on: bool, brightness: u8) -> Model {
    Model::new(Lamp {
        on: Managed::new(on, Timestamp::from_millis(1)),
        brightness: Managed::new(brightness, Timestamp::from_millis(1)),
    })
}

fn id(device: &str, kind: ModelKind) -> PersistenceId {
    EntityKey::new(device, "lamp").with_kind(kind)
}

async fn seed(store: &MemoryPersistence, id: PersistenceId, model: StoredModel) -> u64 {
    let results = store.write(&Context::new(), vec![WriteOp::new(id, model, 0)]).await;
    assert!(results[0].is_ok(), "{:?}", results[0].error);
    results[0].version
}

// ── Errors ───────────────────────────────────────────────────────

#[test]
fn error_status_codes() {
    assert_eq!(PersistenceError::bad_request("x").status(), 400);
    assert_eq!(PersistenceError::not_found("x").status(), 404);
    assert_eq!(PersistenceError::conflict("x").status(), 409);
    assert_eq!(PersistenceError::cancelled("x").status(), 499);
    assert_eq!(PersistenceError::internal("x").status(), 500);
}

#[test]
fn error_display_includes_status_and_sub_code_is_optional() {
    let err = PersistenceError::conflict("stale").with_sub_code("version_mismatch");
    assert_eq!(err.to_string(), "conflict (409): stale");
    assert_eq!(err.sub_code.as_deref(), Some("version_mismatch"));
    assert!(err.is_conflict());
    assert!(PersistenceError::not_found("gone").sub_code.is_none());
}

// ── Read / write ─────────────────────────────────────────────────

#[tokio::test]
async fn write_then_read_single_document() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Reported);
    let version = seed(&store, rid.clone(), StoredModel::Single(lamp(true, 80))).await;
    assert_eq!(version, 1);

    let results = store.read(&Context::new(), vec![ReadOp::new(rid.clone(), shape())]).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].error.is_none());
    assert_eq!(results[0].version, 1);
    assert_eq!(results[0].model, Some(StoredModel::Single(lamp(true, 80))));
}

#[tokio::test]
async fn combined_document_roundtrips_both_parts() {
    let store = MemoryPersistence::new();
    let cid = id("d1", ModelKind::Combined);
    let stored = StoredModel::Combined {
        reported: Some(lamp(true, 10)),
        desired: Some(lamp(false, 0)),
    };
    seed(&store, cid.clone(), stored.clone()).await;

    let raw = store.raw(&cid).await.unwrap();
    assert_eq!(raw["reported"]["on"]["value"], json!(true));
    assert_eq!(raw["desired"]["on"]["value"], json!(false));

    let results = store.read(&Context::new(), vec![ReadOp::new(cid, shape())]).await;
    let model = results[0].model.as_ref().unwrap();
    assert_eq!(model, &stored);
    assert_eq!(model.part(ModelKind::Reported), Some(&lamp(true, 10)));
    assert_eq!(model.part(ModelKind::Desired), Some(&lamp(false, 0)));
    assert_eq!(model.part(ModelKind::Combined), None);
}

#[tokio::test]
async fn combined_document_keeps_absent_parts_absent() {
    let store = MemoryPersistence::new();
    let cid = id("d1", ModelKind::Combined);
    let stored = StoredModel::Combined {
        reported: None,
        desired: Some(lamp(true, 40)),
    };
    seed(&store, cid.clone(), stored.clone()).await;

    let raw = store.raw(&cid).await.unwrap();
    assert_eq!(raw["reported"], json!(null));

    let results = store.read(&Context::new(), vec![ReadOp::new(cid, shape())]).await;
    let model = results[0].model.as_ref().unwrap();
    assert_eq!(model, &stored);
    assert_eq!(model.part(ModelKind::Reported), None);
    assert_eq!(model.part(ModelKind::Desired), Some(&lamp(true, 40)));
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let store = MemoryPersistence::new();
    let results = store
        .read(&Context::new(), vec![ReadOp::new(id("ghost", ModelKind::Reported), shape())])
        .await;
    assert!(results[0].is_not_found());
    assert!(results[0].model.is_none());
}

#[tokio::test]
async fn read_with_stale_version_conflicts() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Reported);
    seed(&store, rid.clone(), StoredModel::Single(lamp(true, 1))).await;
    seed(&store, rid.clone(), StoredModel::Single(lamp(true, 2))).await;

    let results = store
        .read(&Context::new(), vec![
            ReadOp::new(rid.clone(), shape()).at_version(1),
            ReadOp::new(rid.clone(), shape()).at_version(2),
        ])
        .await;
    assert_eq!(results[0].error.as_ref().map(|e| e.kind), Some(ErrorKind::Conflict));
    assert!(results[1].error.is_none());
}

#[tokio::test]
async fn conditional_write_requires_matching_version() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Desired);
    seed(&store, rid.clone(), StoredModel::Single(lamp(false, 0))).await;

    let results = store
        .write(&Context::new(), vec![WriteOp::new(rid.clone(), StoredModel::Single(lamp(true, 5)), 7)])
        .await;
    assert_eq!(results[0].error.as_ref().map(|e| e.status()), Some(409));
    assert_eq!(store.version_of(&rid).await, Some(1));

    let results = store
        .write(&Context::new(), vec![WriteOp::new(rid.clone(), StoredModel::Single(lamp(true, 5)), 1)])
        .await;
    assert!(results[0].is_ok());
    assert_eq!(results[0].version, 2);
    assert!(!results[0].timestamp.is_zero());
}

#[tokio::test]
async fn conditional_write_to_missing_document_conflicts() {
    let store = MemoryPersistence::new();
    let results = store
        .write(&Context::new(), vec![WriteOp::new(
            id("d1", ModelKind::Reported),
            StoredModel::Single(lamp(true, 1)),
            3,
        )])
        .await;
    assert!(results[0].error.as_ref().unwrap().is_conflict());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn mismatched_variant_is_rejected_before_storage() {
    let store = MemoryPersistence::new();
    let results = store
        .write(&Context::new(), vec![
            WriteOp::new(id("d1", ModelKind::Combined), StoredModel::Single(lamp(true, 1)), 0),
            WriteOp::new(
                id("d2", ModelKind::Reported),
                StoredModel::Combined {
                    reported: Some(lamp(true, 1)),
                    desired: Some(lamp(true, 1)),
                },
                0,
            ),
        ])
        .await;
    for result in &results {
        let err = result.error.as_ref().unwrap();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.sub_code.as_deref(), Some("kind_mismatch"));
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn batch_ops_fail_independently() {
    let store = MemoryPersistence::new();
    let results = store
        .write(&Context::new(), vec![
            WriteOp::new(id("a", ModelKind::Reported), StoredModel::Single(lamp(true, 1)), 0),
            WriteOp::new(id("b", ModelKind::Reported), StoredModel::Single(lamp(true, 1)), 9),
            WriteOp::new(id("c", ModelKind::Reported), StoredModel::Single(lamp(true, 1)), 0),
        ])
        .await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(!results[1].is_ok());
    assert!(results[2].is_ok());
    assert_eq!(results[1].id, id("b", ModelKind::Reported));
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn undecodable_document_is_internal_error() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Reported);
    seed(&store, rid.clone(), StoredModel::Single(lamp(true, 1))).await;

    let other: Shape = TypedShape::<Vec<String>>::shared("strings");
    let results = store.read(&Context::new(), vec![ReadOp::new(rid, other)]).await;
    let err = results[0].error.as_ref().unwrap();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(err.sub_code.as_deref(), Some("decode"));
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_honours_version() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Reported);
    seed(&store, rid.clone(), StoredModel::Single(lamp(true, 1))).await;

    let results = store.delete(&Context::new(), vec![DeleteOp::new(rid.clone(), 5)]).await;
    assert!(results[0].error.as_ref().unwrap().is_conflict());

    let results = store.delete(&Context::new(), vec![DeleteOp::new(rid.clone(), 0)]).await;
    assert!(results[0].is_ok());
    assert_eq!(results[0].version, 1);
    assert!(store.is_empty().await);

    let results = store.delete(&Context::new(), vec![DeleteOp::new(rid, 0)]).await;
    assert!(results[0].error.as_ref().unwrap().is_not_found());
}

// ── List ─────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_prefix_and_pages_in_order() {
    let store = MemoryPersistence::new();
    for device in ["hall-1", "hall-2", "hall-3", "yard-1"] {
        seed(&store, id(device, ModelKind::Reported), StoredModel::Single(lamp(true, 1))).await;
    }

    let first = store
        .list(&Context::new(), ListOptions {
            entity_prefix: Some("hall".into()),
            page_size: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = first.entries.iter().map(|e| e.id.key.id.clone()).collect();
    assert_eq!(names, vec!["hall-1", "hall-2"]);
    assert!(first.next_page_token.is_some());

    let second = store
        .list(&Context::new(), ListOptions {
            entity_prefix: Some("hall".into()),
            page_size: Some(2),
            page_token: first.next_page_token.clone(),
        })
        .await
        .unwrap();
    let names: Vec<_> = second.entries.iter().map(|e| e.id.key.id.clone()).collect();
    assert_eq!(names, vec!["hall-3"]);
    assert!(second.next_page_token.is_none());
    assert_eq!(second.entries[0].version, 1);
}

#[tokio::test]
async fn list_without_options_returns_everything() {
    let store = MemoryPersistence::new();
    seed(&store, id("a", ModelKind::Reported), StoredModel::Single(lamp(true, 1))).await;
    seed(&store, id("a", ModelKind::Desired), StoredModel::Single(lamp(true, 1))).await;
    let page = store.list(&Context::new(), ListOptions::default()).await.unwrap();
    assert_eq!(page.entries.len(), 2);
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn list_rejects_garbage_page_token() {
    let store = MemoryPersistence::new();
    let err = store
        .list(&Context::new(), ListOptions {
            page_token: Some("not-a-token".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
}

// ── Context ──────────────────────────────────────────────────────

#[tokio::test]
async fn done_context_fails_every_op_without_touching_the_store() {
    let store = MemoryPersistence::new();
    let rid = id("d1", ModelKind::Reported);
    seed(&store, rid.clone(), StoredModel::Single(lamp(true, 1))).await;

    let ctx = Context::new();
    ctx.cancel();
    let written = store
        .write(&ctx, vec![WriteOp::new(rid.clone(), StoredModel::Single(lamp(false, 2)), 0)])
        .await;
    assert_eq!(written.len(), 1);
    assert!(written[0].error.as_ref().unwrap().is_cancelled());
    assert_eq!(store.version_of(&rid).await, Some(1));

    let deleted = store.delete(&ctx, vec![DeleteOp::new(rid.clone(), 0)]).await;
    assert!(deleted[0].error.as_ref().unwrap().is_cancelled());

    let read = store.read(&ctx, vec![ReadOp::new(rid, shape())]).await;
    assert_eq!(read[0].error.as_ref().map(|e| e.kind), Some(ErrorKind::Cancelled));

    let err = store.list(&ctx, ListOptions::default()).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_is_reported_as_such() {
    let store = MemoryPersistence::new();
    let ctx = Context::new().timeout(std::time::Duration::from_millis(10));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(ctx.is_done());

    let read = store.read(&ctx, vec![ReadOp::new(id("d1", ModelKind::Reported), shape())]).await;
    let err = read[0].error.as_ref().unwrap();
    assert!(err.is_cancelled());
    assert_eq!(err.sub_code.as_deref(), Some("deadline"));
}

#[tokio::test(start_paused = true)]
async fn run_stops_waiting_at_the_deadline() {
    let ctx = Context::new().timeout(std::time::Duration::from_millis(20));
    let started = tokio::time::Instant::now();
    let out = ctx.run(std::future::pending::<()>()).await;
    assert!(out.unwrap_err().is_cancelled());
    let elapsed = started.elapsed();
    assert!(elapsed >= std::time::Duration::from_millis(20));
    assert!(elapsed < std::time::Duration::from_millis(500));

    let ctx = Context::new();
    assert_eq!(ctx.run(async { 7 }).await, Ok(7));
}

#[test]
fn child_context_follows_parent() {
    let parent = Context::new();
    let child = parent.child();
    assert!(child.check().is_ok());
    parent.cancel();
    assert!(child.is_done());
    assert!(child.check().unwrap_err().is_cancelled());
}
