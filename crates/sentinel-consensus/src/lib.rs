use std::collections::HashMap;

use sentinel_core::Signature;
use sentinel_storage::LedgerStore;

/// Per-signature metrics the resolver records for every signature it
/// considers, accepted or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureMetrics {
    pub signature_id: i64,
    pub consensus_reached: bool,
    pub consensus_votes: usize,
    pub consensus_rate: f64,
}

/// The resolver's output: the signatures accepted this tick (in id order,
/// ready for the scheduler to fan out to `Node::apply_accepted`) and a
/// metrics row per signature considered, accepted or not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsensusOutcome {
    pub accepted: Vec<Signature>,
    pub metrics: Vec<SignatureMetrics>,
}

/// Pure majority-vote consensus over `validations`: signature id -> the
/// votes every validating node cast on it this tick. A signature is
/// accepted iff its true-vote count is `>= threshold` (inclusive, so an
/// exact tie at the threshold accepts, since the threshold is itself a
/// strict majority by construction). Looks up each accepted signature's
/// full content via
/// `ledger`; a signature missing from the ledger is logged and skipped
/// rather than failing the whole resolution.
///
/// This function touches no shared mutable state — it only reads
/// `validations` and `ledger` — so it is safe to call from the scheduler's
/// orchestration thread without any locking of its own.
pub fn resolve(validations: &HashMap<i64, Vec<bool>>, threshold: usize, ledger: &dyn LedgerStore) -> ConsensusOutcome {
    let mut accepted = Vec::new();
    let mut metrics = Vec::with_capacity(validations.len());

    for (&signature_id, votes) in validations {
        let true_votes = votes.iter().filter(|&&v| v).count();
        let consensus_reached = true_votes >= threshold;
        let consensus_rate = if votes.is_empty() { 0.0 } else { true_votes as f64 / votes.len() as f64 };

        metrics.push(SignatureMetrics { signature_id, consensus_reached, consensus_votes: true_votes, consensus_rate });

        if consensus_reached {
            match ledger.get_by_id(signature_id) {
                Ok(Some(entry)) => accepted.push(entry.signature),
                Ok(None) => tracing::warn!(signature_id, "accepted signature not found in ledger, skipping"),
                Err(e) => tracing::warn!(signature_id, error = %e, "failed to fetch accepted signature"),
            }
        }
    }

    metrics.sort_by_key(|m| m.signature_id);
    accepted.sort_by_key(|s| s.id);
    ConsensusOutcome { accepted, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::FeatureRecord;
    use sentinel_storage::{LedgerConfig, SqliteLedger};

    fn test_ledger() -> (SqliteLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let ledger = SqliteLedger::open(LedgerConfig { path: path.to_string_lossy().into_owned(), ..LedgerConfig::default() }).unwrap();
        (ledger, dir)
    }

    fn sample(ts: f64, node: &str) -> Signature {
        Signature::new(ts, node, vec![FeatureRecord::new(100.0, "a")], 0.5)
    }

    #[test]
    fn scenario_c_consensus_majority() {
        // numAgents = 4, threshold = 3.
        let (ledger, _dir) = test_ledger();
        let id1 = ledger.append(sample(1.0, "Node_1")).unwrap();
        let id2 = ledger.append(sample(2.0, "Node_2")).unwrap();
        let id3 = ledger.append(sample(3.0, "Node_3")).unwrap();

        let mut validations = HashMap::new();
        validations.insert(id1, vec![true, true, false, true]);
        validations.insert(id2, vec![true, false, false, false]);
        validations.insert(id3, vec![true, true, true, true, true]); // stale agent: extra vote

        let outcome = resolve(&validations, 3, &ledger);
        let accepted_ids: Vec<i64> = outcome.accepted.iter().map(|s| s.id.unwrap()).collect();
        assert_eq!(accepted_ids, vec![id1, id3]);
        assert!(!outcome.metrics.iter().find(|m| m.signature_id == id2).unwrap().consensus_reached);
    }

    #[test]
    fn exact_threshold_tie_is_accepted() {
        let (ledger, _dir) = test_ledger();
        let id = ledger.append(sample(1.0, "Node_1")).unwrap();
        let mut validations = HashMap::new();
        validations.insert(id, vec![true, true, true, false]);
        let outcome = resolve(&validations, 3, &ledger);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn below_threshold_is_rejected() {
        let (ledger, _dir) = test_ledger();
        let id = ledger.append(sample(1.0, "Node_1")).unwrap();
        let mut validations = HashMap::new();
        validations.insert(id, vec![true, false, false]);
        let outcome = resolve(&validations, 3, &ledger);
        assert!(outcome.accepted.is_empty());
    }

    #[test]
    fn missing_ledger_entry_is_skipped_not_fatal() {
        let (ledger, _dir) = test_ledger();
        let mut validations = HashMap::new();
        validations.insert(9999, vec![true, true, true]);
        let outcome = resolve(&validations, 1, &ledger);
        assert!(outcome.accepted.is_empty());
        assert!(outcome.metrics[0].consensus_reached);
    }

    #[test]
    fn single_agent_simulation_decides_alone() {
        let (ledger, _dir) = test_ledger();
        let id = ledger.append(sample(1.0, "Node_1")).unwrap();
        let mut validations = HashMap::new();
        validations.insert(id, vec![true]);
        let outcome = resolve(&validations, 1, &ledger);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn consensus_rate_is_fraction_of_true_votes() {
        let (ledger, _dir) = test_ledger();
        let id = ledger.append(sample(1.0, "Node_1")).unwrap();
        let mut validations = HashMap::new();
        validations.insert(id, vec![true, true, false, false]);
        let outcome = resolve(&validations, 3, &ledger);
        assert_eq!(outcome.metrics[0].consensus_rate, 0.5);
    }
}
