use chrono::Utc;
use ferrous_dns_audit_domain::TopicTag;
use ferrous_dns_audit_infrastructure::ingest::{Entry, SpillCache};
use tempfile::TempDir;

fn entry(payload: &str) -> Entry {
    Entry::new(Utc::now(), TopicTag::new(0), payload.as_bytes().to_vec())
}

#[tokio::test]
async fn test_append_and_drain_in_order() {
    let dir = TempDir::new().unwrap();
    let mut cache = SpillCache::open(dir.path().join("cache"), 0).await.unwrap();
    let entries = vec![entry("a"), entry("b"), entry("c")];

    for e in &entries {
        assert!(cache.append(e).await.unwrap());
    }

    assert!(!cache.is_empty());
    assert_eq!(cache.drain().await.unwrap(), entries);
    assert!(cache.is_empty());
    assert!(cache.drain().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_size_bound_drops_overflow() {
    let dir = TempDir::new().unwrap();
    let first = entry("0123456789");
    let bound = first.encoded_len() as u64 + 5;
    let mut cache = SpillCache::open(dir.path().join("cache"), bound).await.unwrap();

    assert!(cache.append(&first).await.unwrap());
    assert!(!cache.append(&entry("0123456789")).await.unwrap());

    assert_eq!(cache.size(), first.encoded_len() as u64);
    assert_eq!(cache.drain().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reopen_keeps_existing_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache");
    {
        let mut cache = SpillCache::open(&path, 0).await.unwrap();
        cache.append(&entry("persisted")).await.unwrap();
    }

    let mut cache = SpillCache::open(&path, 0).await.unwrap();

    assert!(cache.size() > 0);
    let entries = cache.drain().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(&entries[0].payload[..], b"persisted");
}

#[tokio::test]
async fn test_truncated_tail_is_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache");
    let whole = entry("whole");
    let mut bytes = whole.to_bytes().to_vec();
    let partial = entry("partial").to_bytes();
    bytes.extend_from_slice(&partial[..partial.len() - 3]);
    tokio::fs::write(&path, &bytes).await.unwrap();

    let mut cache = SpillCache::open(&path, 0).await.unwrap();
    let entries = cache.drain().await.unwrap();

    assert_eq!(entries, vec![whole]);
    assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), 0);
}
