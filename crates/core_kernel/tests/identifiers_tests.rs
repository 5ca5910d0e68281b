//! Unit tests for strongly-typed identifiers

use core_kernel::{AccountId, ActorId, AuditEventId, CompanyId, EntryId, VoucherId};
use uuid::Uuid;

#[test]
fn test_display_prefixes() {
    assert!(VoucherId::new().to_string().starts_with("VCH-"));
    assert!(EntryId::new().to_string().starts_with("ENT-"));
    assert!(AccountId::new().to_string().starts_with("ACC-"));
    assert!(CompanyId::new().to_string().starts_with("CMP-"));
    assert!(ActorId::new().to_string().starts_with("USR-"));
    assert!(AuditEventId::new().to_string().starts_with("AUD-"));
}

#[test]
fn test_parse_with_prefix() {
    let id = VoucherId::new();
    let parsed: VoucherId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn test_parse_bare_uuid() {
    let uuid = Uuid::new_v4();
    let parsed: AccountId = uuid.to_string().parse().unwrap();
    assert_eq!(parsed, AccountId::from(uuid));
}

#[test]
fn test_v7_ids_are_time_ordered() {
    let a = VoucherId::new_v7();
    let b = VoucherId::new_v7();
    assert!(a.as_uuid() <= b.as_uuid());
}

#[test]
fn test_serde_is_transparent() {
    let id = CompanyId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));

    let back: CompanyId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
