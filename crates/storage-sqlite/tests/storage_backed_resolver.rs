//! Resolver wired to SQLite-backed cache and audit storage.

use std::sync::Arc;

use territory_core::{RawAddress, TerritoryResolver};
use territory_storage_sqlite::{get_db_path, SqliteStorage};

fn open(dir: &tempfile::TempDir) -> SqliteStorage {
    SqliteStorage::open(&get_db_path(&dir.path().to_string_lossy())).unwrap()
}

#[tokio::test]
async fn resolutions_are_audited_and_cached_durably() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open(&dir);
    let logs = Arc::new(storage.validation_logs());

    let resolver = TerritoryResolver::builder()
        .cache_tier(Arc::new(storage.cache_tier()))
        .audit_sink(logs.clone())
        .build()
        .unwrap();

    let raw = RawAddress::new("1234 Belt Line Road", "Addison", "TX", "75001");
    let first = resolver.resolve(&raw).await.unwrap();
    assert!(!first.from_cache);

    let recorded = logs.for_postal_code("75001").unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].operator_id.as_deref(), Some("1039940674000"));
}

#[tokio::test]
async fn durable_tier_survives_a_new_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open(&dir);
    let raw = RawAddress::new("100 Congress Ave", "Austin", "TX", "78701");

    {
        let resolver = TerritoryResolver::builder()
            .cache_tier(Arc::new(storage.cache_tier()))
            .build()
            .unwrap();
        assert!(!resolver.resolve(&raw).await.unwrap().from_cache);
    }

    // Fresh memory tier, same database.
    let resolver = TerritoryResolver::builder()
        .cache_tier(Arc::new(storage.cache_tier()))
        .build()
        .unwrap();
    let again = resolver.resolve(&raw).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.operator.id, "AE-0001");
}
