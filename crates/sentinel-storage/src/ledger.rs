use sentinel_core::{Result, Signature};

/// A ledger-owned copy of a `Signature`, stamped with the store's own
/// `created_at` wall-clock timestamp, distinct from the signature's own
/// `timestamp` field.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub signature: Signature,
    pub created_at: f64,
}

impl LedgerEntry {
    pub fn id(&self) -> i64 {
        self.signature.id.expect("ledger entries always carry an assigned id")
    }
}

/// The contract every ledger backend must satisfy. Nodes hold a
/// `&dyn LedgerStore` (or an `Arc<dyn LedgerStore>`), never a reference to
/// the `Simulation` itself — this breaks what would otherwise be a
/// node-to-simulation-to-node ownership cycle.
pub trait LedgerStore: Send + Sync {
    /// Validates required fields and uniqueness, assigns and returns the
    /// new id.
    fn append(&self, entry: Signature) -> Result<i64>;

    /// All entries, ascending by id. May be served from a TTL cache.
    fn read_all(&self) -> Result<Vec<LedgerEntry>>;

    /// Entries with `id > last_seen_id`, ascending by id.
    fn read_since(&self, last_seen_id: i64) -> Result<Vec<LedgerEntry>>;

    /// A single entry by id, or `None` if absent.
    fn get_by_id(&self, id: i64) -> Result<Option<LedgerEntry>>;

    /// Entries authored by `node_id`, descending by timestamp, optionally
    /// capped at `limit`.
    fn get_by_node(&self, node_id: &str, limit: Option<usize>) -> Result<Vec<LedgerEntry>>;

    /// Deletes entries older than `now - max_age_seconds`; returns the
    /// count deleted.
    fn prune_older_than(&self, now: f64, max_age_seconds: f64) -> Result<usize>;

    /// Number of entries currently stored.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
