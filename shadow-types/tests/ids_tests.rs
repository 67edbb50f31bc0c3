use shadow_types::{ClientToken, EntityKey, ModelKind, PersistenceId};
use std::collections::HashSet;
use std::str::FromStr;

// ── EntityKey ─────────────────────────────────────────────────────

#[test]
fn entity_key_display() {
    let key = EntityKey::new("device-1", "thermostat");
    assert_eq!(key.to_string(), "device-1/thermostat");
}

#[test]
fn entity_key_hash_distinguishes_name() {
    let mut set = HashSet::new();
    set.insert(EntityKey::new("d", "a"));
    set.insert(EntityKey::new("d", "b"));
    set.insert(EntityKey::new("d", "a"));
    assert_eq!(set.len(), 2);
}

#[test]
fn with_kind_builds_persistence_id() {
    let key = EntityKey::new("d", "n");
    let pid = key.with_kind(ModelKind::Desired);
    assert_eq!(pid.key, key);
    assert_eq!(pid.kind, ModelKind::Desired);
    assert_eq!(pid.to_string(), "d/n#desired");
}

// ── ModelKind ─────────────────────────────────────────────────────

#[test]
fn model_kind_default_is_combined() {
    assert_eq!(ModelKind::default(), ModelKind::Combined);
}

#[test]
fn model_kind_parse_roundtrip() {
    for kind in [ModelKind::Combined, ModelKind::Reported, ModelKind::Desired] {
        assert_eq!(ModelKind::from_str(kind.as_str()).unwrap(), kind);
    }
}

#[test]
fn model_kind_parse_invalid() {
    assert!(ModelKind::from_str("shadow").is_err());
}

#[test]
fn model_kind_serde_snake_case() {
    assert_eq!(serde_json::to_string(&ModelKind::Reported).unwrap(), r#""reported""#);
}

// ── PersistenceId ─────────────────────────────────────────────────

#[test]
fn persistence_id_token_roundtrip() {
    let pid = PersistenceId::new(EntityKey::new("dev/1", "n:2"), ModelKind::Reported);
    let token = pid.to_token().unwrap();
    assert_eq!(PersistenceId::from_token(&token).unwrap(), pid);
}

#[test]
fn persistence_id_bad_token() {
    assert!(PersistenceId::from_token("garbage").is_err());
}

#[test]
fn persistence_id_orders_by_key_then_kind() {
    let key = EntityKey::new("a", "x");
    let reported = key.with_kind(ModelKind::Reported);
    let desired = key.with_kind(ModelKind::Desired);
    let other = EntityKey::new("b", "x").with_kind(ModelKind::Combined);
    assert!(reported < desired);
    assert!(desired < other);
}

// ── ClientToken ───────────────────────────────────────────────────

#[test]
fn client_token_generate_is_unique() {
    assert_ne!(ClientToken::generate(), ClientToken::generate());
}

#[test]
fn client_token_default_is_empty() {
    assert!(ClientToken::default().is_empty());
    assert_eq!(ClientToken::from("abc").as_str(), "abc");
}

#[test]
fn client_token_serde_transparent() {
    let token = ClientToken::new("t-1");
    assert_eq!(serde_json::to_string(&token).unwrap(), r#""t-1""#);
}
