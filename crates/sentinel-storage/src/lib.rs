pub mod cache;
pub mod errors;
pub mod fingerprint;
pub mod ledger;
pub mod sqlite_ledger;

pub use cache::{CacheStats, ValidationCache};
pub use fingerprint::fingerprint;
pub use ledger::{LedgerEntry, LedgerStore};
pub use sqlite_ledger::{LedgerConfig, SqliteLedger};

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{FeatureRecord, Signature};

    fn temp_ledger() -> (SqliteLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let config = LedgerConfig {
            path: path.to_string_lossy().into_owned(),
            ..LedgerConfig::default()
        };
        (SqliteLedger::open(config).unwrap(), dir)
    }

    fn sample(ts: f64, node: &str) -> Signature {
        Signature::new(ts, node, vec![FeatureRecord::new(500.0, "192.168.1.5")], 0.7)
    }

    #[test]
    fn append_then_get_by_id_round_trips_content() {
        let (ledger, _dir) = temp_ledger();
        let id = ledger.append(sample(1.0, "Node_1")).unwrap();
        let fetched = ledger.get_by_id(id).unwrap().unwrap();
        assert_eq!(fetched.signature.node_id, "Node_1");
        assert_eq!(fetched.signature.id, Some(id));
    }

    #[test]
    fn ids_are_monotonically_increasing_over_append_order() {
        let (ledger, _dir) = temp_ledger();
        let id1 = ledger.append(sample(1.0, "Node_1")).unwrap();
        let id2 = ledger.append(sample(2.0, "Node_2")).unwrap();
        assert!(id1 < id2);
    }

    #[test]
    fn duplicate_timestamp_and_node_is_rejected() {
        let (ledger, _dir) = temp_ledger();
        ledger.append(sample(1.0, "Node_1")).unwrap();
        let result = ledger.append(sample(1.0, "Node_1"));
        assert!(result.is_err());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn read_since_zero_matches_read_all() {
        let (ledger, _dir) = temp_ledger();
        ledger.append(sample(1.0, "Node_1")).unwrap();
        ledger.append(sample(2.0, "Node_2")).unwrap();
        let all = ledger.read_all().unwrap();
        let since = ledger.read_since(0).unwrap();
        assert_eq!(all, since);
    }

    #[test]
    fn read_since_only_returns_newer_entries() {
        let (ledger, _dir) = temp_ledger();
        let id1 = ledger.append(sample(1.0, "Node_1")).unwrap();
        ledger.append(sample(2.0, "Node_2")).unwrap();
        let since = ledger.read_since(id1).unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].signature.node_id, "Node_2");
    }

    #[test]
    fn get_by_node_orders_by_timestamp_descending() {
        let (ledger, _dir) = temp_ledger();
        ledger.append(sample(1.0, "Node_1")).unwrap();
        ledger.append(sample(3.0, "Node_1")).unwrap();
        ledger.append(sample(2.0, "Node_1")).unwrap();
        let entries = ledger.get_by_node("Node_1", None).unwrap();
        let timestamps: Vec<f64> = entries.iter().map(|e| e.signature.timestamp).collect();
        assert_eq!(timestamps, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn get_by_id_returns_none_for_absent_id() {
        let (ledger, _dir) = temp_ledger();
        assert!(ledger.get_by_id(999).unwrap().is_none());
    }

    #[test]
    fn prune_older_than_deletes_and_invalidates_cache() {
        let (ledger, _dir) = temp_ledger();
        ledger.append(sample(1.0, "Node_1")).unwrap();
        ledger.append(sample(100.0, "Node_2")).unwrap();
        let deleted = ledger.prune_older_than(100.0, 10.0).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn read_all_cache_serves_stale_data_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let config = LedgerConfig {
            path: path.to_string_lossy().into_owned(),
            cache_ttl: std::time::Duration::from_secs(300),
            ..LedgerConfig::default()
        };
        let ledger = SqliteLedger::open(config).unwrap();
        ledger.append(sample(1.0, "Node_1")).unwrap();
        let first = ledger.read_all().unwrap();
        // Append bypasses the cache lookup path directly (invalidate on write),
        // so the cache only matters for back-to-back reads with no writes between.
        let second = ledger.read_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn validation_rejects_malformed_signature() {
        let (ledger, _dir) = temp_ledger();
        let bad = Signature::new(1.0, "", vec![FeatureRecord::new(1.0, "a")], 0.5);
        assert!(ledger.append(bad).is_err());
        assert_eq!(ledger.len().unwrap(), 0);
    }
}
