mod common;

use common::*;
use pretty_assertions::assert_eq;
use shadow_manager::{Context, DesireEntry, ReadEntry, ReportEntry, ShadowError, StorageLayout};
use shadow_merge::Managed;
use shadow_types::ModelKind;

fn fan(mode: &str, at: u64) -> Thermostat {
    Thermostat {
        fan: Managed::new(mode.to_string(), ts(at)),
        ..Default::default()
    }
}

#[tokio::test]
async fn first_desire_creates_document() {
    let (manager, persistence) = manager(StorageLayout::Separate);
    let results = manager
        .desire(
            &Context::new(),
            vec![DesireEntry::new(key("t1"), model(set_point(22.0, 100))).with_token("req-1")],
        )
        .await;
    let result = &results[0];
    assert!(result.is_ok());
    assert!(result.dirty);
    assert!(result.processed);
    assert_eq!(result.version, 1);
    assert_eq!(result.client_token.as_str(), "req-1");
    assert_eq!(doc(&result.desired), set_point(22.0, 100));
    // The reported document is neither read nor written.
    assert_eq!(persistence.reads(), 1);
    assert_eq!(
        persistence.inner.version_of(&key("t1").with_kind(ModelKind::Reported)).await,
        None
    );
}

#[tokio::test]
async fn desire_is_upsert_only() {
    let (manager, _) = manager(StorageLayout::Separate);
    let ctx = Context::new();
    manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(set_point(22.0, 100)))])
        .await;
    let results = manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(fan("auto", 110)))])
        .await;
    let desired = doc(&results[0].desired);
    assert_eq!(desired.indoor_temp_sp, Managed::new(22.0, ts(100)));
    assert_eq!(desired.fan, Managed::new("auto".to_string(), ts(110)));
    assert_eq!(results[0].version, 2);
}

#[tokio::test]
async fn older_desire_loses() {
    let (manager, persistence) = manager(StorageLayout::Separate);
    let ctx = Context::new();
    manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(set_point(22.0, 100)))])
        .await;
    persistence.reset_counters();
    let results = manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(set_point(25.0, 50)))])
        .await;
    assert!(results[0].is_ok());
    assert!(!results[0].dirty);
    assert_eq!(doc(&results[0].desired), set_point(22.0, 100));
    assert_eq!(persistence.writes(), 0);
}

#[tokio::test]
async fn missing_model_is_rejected() {
    let (manager, _) = manager(StorageLayout::Separate);
    let mut entry = DesireEntry::new(key("t1"), model(set_point(22.0, 1)));
    entry.model = None;
    let results = manager.desire(&Context::new(), vec![entry]).await;
    assert!(matches!(results[0].error, Some(ShadowError::InvalidInput(_))));
    assert!(!results[0].processed);
}

#[tokio::test]
async fn combined_desire_preserves_reported_part() {
    let (manager, persistence) = manager(StorageLayout::Combined);
    let ctx = Context::new();
    manager
        .report(&ctx, vec![ReportEntry::new(key("t1"), model(set_point(20.0, 10)))])
        .await;
    let results = manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(set_point(22.0, 100)))])
        .await;
    assert_eq!(results[0].version, 2);

    let raw = persistence
        .inner
        .raw(&key("t1").with_kind(ModelKind::Combined))
        .await
        .unwrap();
    assert_eq!(raw["reported"]["indoor_temp_sp"]["value"], serde_json::json!(20.0));
    assert_eq!(raw["desired"]["indoor_temp_sp"]["value"], serde_json::json!(22.0));

    let read = manager
        .read(
            &ctx,
            vec![
                ReadEntry::new(key("t1"), ModelKind::Reported),
                ReadEntry::new(key("t1"), ModelKind::Desired),
            ],
        )
        .await;
    assert_eq!(doc(&read[0].model), set_point(20.0, 10));
    assert_eq!(doc(&read[1].model), set_point(22.0, 100));
    assert_eq!(read[0].version, 2);
    assert_eq!(read[1].version, 2);
}

#[tokio::test]
async fn combined_first_desire_leaves_reported_absent() {
    let (manager, persistence) = manager(StorageLayout::Combined);
    let ctx = Context::new();
    manager
        .desire(&ctx, vec![DesireEntry::new(key("t1"), model(set_point(22.0, 100)))])
        .await;
    let raw = persistence
        .inner
        .raw(&key("t1").with_kind(ModelKind::Combined))
        .await
        .unwrap();
    assert_eq!(raw["reported"], serde_json::Value::Null);

    let read = manager
        .read(&ctx, vec![ReadEntry::new(key("t1"), ModelKind::Reported)])
        .await;
    assert!(read[0].error.as_ref().is_some_and(ShadowError::is_not_found));
    assert!(read[0].model.is_none());
}
