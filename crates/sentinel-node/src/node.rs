use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sentinel_core::{rng::node_rng, BlacklistRecord, FeatureRecord, Result, SentinelError, Signature, ValidationVerdict};
use sentinel_detector::{generate_traffic, AnomalyDetector, TrafficBatch};
use sentinel_storage::{fingerprint, CacheStats, LedgerStore, ValidationCache};

/// Per-node tunables, one struct per node so a simulation can in principle
/// run a heterogeneous population (the scheduler currently gives every node
/// the same config).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub anomaly_threshold: f64,
    pub min_data_points: usize,
    pub validation_failure_rate: f64,
    pub cache_max_size: usize,
    pub recent_data_capacity: usize,
    pub batch_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: -0.05,
            min_data_points: 10,
            validation_failure_rate: 0.2,
            cache_max_size: 100,
            recent_data_capacity: 100,
            batch_size: 100,
        }
    }
}

/// A magnitude-alignment ratio of 1.0 means the signature's mean packet
/// size exactly matches the node's recent observations; below this ratio
/// the signature is treated as suspicious before the failure-rate flip is
/// applied. The exact acceptance cutoff is a tunable judgment call, not a
/// derived constant.
const ALIGNMENT_ACCEPT_RATIO: f64 = 0.5;

/// Output of the detection step: which indices in the batch were flagged,
/// their values/synthesized source IPs, the anomaly-only scores (used to
/// build a signature), and the full per-point score array (attached back
/// onto the traffic batch for callers that want it).
pub struct DetectionResult {
    pub has_anomaly: bool,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
    pub ips: Vec<String>,
    pub anomaly_scores: Vec<f64>,
    pub full_scores: Vec<f64>,
}

/// Result of one `Node::act` tick: the id of the signature this node
/// broadcast this tick (if any), and whether the phase aborted partway
/// through with an error (captured as a metric by the scheduler, never
/// propagated).
#[derive(Debug, Default)]
pub struct ActOutcome {
    pub signature_id: Option<i64>,
    pub errored: bool,
}

pub struct Node {
    id: String,
    config: NodeConfig,
    recent_data: crate::ring::RecentDataRing,
    detector: AnomalyDetector,
    cache: ValidationCache,
    last_seen_ledger_id: i64,
    blacklist_path: PathBuf,
    ledger: Arc<dyn LedgerStore>,
    rng: ChaCha8Rng,
}

impl Node {
    pub fn new(index: u64, ledger: Arc<dyn LedgerStore>, seed: Option<u64>, config: NodeConfig, blacklist_dir: &std::path::Path) -> Self {
        let id = format!("Node_{index}");
        let mut rng = node_rng(seed, index);
        let detector_seed = rng.gen::<u64>();
        Self {
            blacklist_path: blacklist_dir.join(format!("{id}_blacklist.json")),
            detector: AnomalyDetector::new(detector_seed, config.min_data_points),
            recent_data: crate::ring::RecentDataRing::new(config.recent_data_capacity),
            cache: ValidationCache::new(config.cache_max_size),
            last_seen_ledger_id: 0,
            id,
            config,
            ledger,
            rng,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_seen_ledger_id(&self) -> i64 {
        self.last_seen_ledger_id
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn recent_data_len(&self) -> usize {
        self.recent_data.len()
    }

    /// Draws one batch of synthetic traffic and folds it into the
    /// recent-data ring.
    fn perceive(&mut self, force_anomaly: bool) -> TrafficBatch {
        let batch = generate_traffic(self.config.batch_size, force_anomaly, &mut self.rng);
        self.recent_data.extend(batch.values.iter().copied());
        batch
    }

    /// Fits the detector on `values`, scores every point, and flags the
    /// ones below `anomaly_threshold`, synthesizing a source IP for each.
    fn detect(&mut self, values: &[f64]) -> DetectionResult {
        if values.is_empty() {
            return DetectionResult {
                has_anomaly: false,
                indices: Vec::new(),
                values: Vec::new(),
                ips: Vec::new(),
                anomaly_scores: Vec::new(),
                full_scores: Vec::new(),
            };
        }

        self.detector.fit(values);
        let full_scores = self.detector.score(values);
        let indices = AnomalyDetector::anomaly_mask(&full_scores, self.config.anomaly_threshold);

        let mut anomaly_values = Vec::with_capacity(indices.len());
        let mut ips = Vec::with_capacity(indices.len());
        let mut anomaly_scores = Vec::with_capacity(indices.len());
        for &idx in &indices {
            anomaly_values.push(values[idx]);
            anomaly_scores.push(full_scores[idx]);
            let octet: u32 = self.rng.gen_range(1..=255);
            ips.push(format!("192.168.1.{octet}"));
        }

        DetectionResult {
            has_anomaly: !indices.is_empty(),
            indices,
            values: anomaly_values,
            ips,
            anomaly_scores,
            full_scores,
        }
    }

    /// Builds a `Signature` from equal-length anomaly values/ips/scores.
    /// Fails with a validation error on any length mismatch or empty input.
    fn generate_signature(&self, values: &[f64], ips: &[String], scores: &[f64]) -> Result<Signature> {
        if values.is_empty() || ips.is_empty() || scores.is_empty() {
            return Err(SentinelError::validation("signature generation requires non-empty inputs"));
        }
        if values.len() != ips.len() || values.len() != scores.len() {
            return Err(SentinelError::validation("values, ips, and scores must be equal length"));
        }

        let features: Vec<FeatureRecord> = values
            .iter()
            .zip(ips.iter())
            .map(|(&v, ip)| FeatureRecord::new(v, ip.clone()))
            .collect();

        let abs_mean = scores.iter().map(|s| s.abs()).sum::<f64>() / scores.len() as f64;
        let confidence = abs_mean.clamp(0.0, 1.0);

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64();

        Ok(Signature::new(timestamp, self.id.clone(), features, confidence))
    }

    /// Appends `sig` to the ledger and stamps the assigned id back onto it.
    /// A ledger failure is wrapped as `SentinelError::Broadcast`: fatal for
    /// this tick, not for the simulation.
    fn broadcast(&self, sig: &mut Signature) -> Result<()> {
        match self.ledger.append(sig.clone()) {
            Ok(id) => {
                sig.id = Some(id);
                Ok(())
            }
            Err(e) => Err(SentinelError::Broadcast { node_id: self.id.clone(), reason: e.to_string() }),
        }
    }

    /// Polls the ledger for entries this node has not yet seen, skips
    /// self-authored ones, and validates the rest. `last_seen_ledger_id` is
    /// advanced to the maximum id observed regardless of which entries were
    /// skipped, so a node never re-polls an entry it has already accounted
    /// for. Must run only after every node's act phase for this tick has
    /// finished, so every node's poll observes every signature broadcast
    /// this tick, not just the ones broadcast before it.
    pub fn poll_and_validate(&mut self) -> Vec<ValidationVerdict> {
        let entries = match self.ledger.read_since(self.last_seen_ledger_id) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(node_id = %self.id, error = %e, "poll failed, will retry next tick");
                return Vec::new();
            }
        };

        let mut verdicts = Vec::new();
        let mut max_id = self.last_seen_ledger_id;
        for entry in entries {
            let entry_id = entry.id();
            max_id = max_id.max(entry_id);
            if entry.signature.node_id == self.id {
                continue;
            }
            let is_valid = self.validate_signature(&entry.signature);
            verdicts.push(ValidationVerdict::new(entry_id, is_valid));
        }
        self.last_seen_ledger_id = max_id;
        verdicts
    }

    /// Deterministic (given RNG state and cache contents) validation of a
    /// signature this node did not author, via a magnitude-alignment ratio
    /// rather than a literal 1-D cosine similarity (which would always be
    /// +-1 on a single scalar mean and carry no signal).
    pub fn validate_signature(&mut self, sig: &Signature) -> bool {
        let fp = fingerprint(sig);
        if let Some(cached) = self.cache.get(fp) {
            return cached;
        }

        let verdict = if self.recent_data.len() < self.config.min_data_points {
            false
        } else {
            match (sig.mean_packet_size(), self.recent_data.mean()) {
                (Some(sig_mean), Some(recent_mean)) if sig_mean != 0.0 && recent_mean != 0.0 => {
                    let ratio = sig_mean.abs().min(recent_mean.abs()) / sig_mean.abs().max(recent_mean.abs());
                    let base_verdict = ratio >= ALIGNMENT_ACCEPT_RATIO;
                    if self.rng.gen_bool(self.config.validation_failure_rate) {
                        !base_verdict
                    } else {
                        base_verdict
                    }
                }
                _ => false,
            }
        };

        self.cache.put(fp, verdict);
        verdict
    }

    /// Consensus post-acceptance hook: persists `sig` to the local
    /// blacklist and, if enough data is now available, retrains the
    /// detector on the combined sample.
    pub fn apply_accepted(&mut self, sig: &Signature) -> Result<()> {
        let record = BlacklistRecord::from(sig);
        crate::blacklist::append(&self.blacklist_path, record)
            .map_err(|e| SentinelError::Io { node_id: self.id.clone(), reason: e.to_string() })?;

        let mut combined = self.recent_data.as_slice_vec();
        for f in &sig.features {
            if f.packet_size.is_finite() {
                combined.push(f.packet_size);
            } else {
                tracing::warn!(node_id = %self.id, "dropped non-numeric packet size during retrain");
            }
        }
        if combined.len() >= self.config.min_data_points {
            self.detector.fit(&combined);
        }
        Ok(())
    }

    /// This node's act phase for one tick: perceive, detect, decide, and
    /// (if anomalous) broadcast a signature and retrain on it. Does not
    /// validate other nodes' signatures — that is `poll_and_validate`, a
    /// separate phase the scheduler runs only after every node has
    /// finished acting this tick, so no node polls ahead of a peer's
    /// broadcast. Any error aborts the remaining steps of this phase and
    /// is logged; the node is still usable next tick.
    pub fn act(&mut self) -> ActOutcome {
        match self.act_inner() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(node_id = %self.id, error = %e, "node act phase aborted");
                ActOutcome { errored: true, ..ActOutcome::default() }
            }
        }
    }

    fn act_inner(&mut self) -> Result<ActOutcome> {
        let batch = self.perceive(false);
        let detection = self.detect(&batch.values);

        let mut signature_id = None;
        if detection.has_anomaly {
            let mut sig = self.generate_signature(&detection.values, &detection.ips, &detection.anomaly_scores)?;
            self.broadcast(&mut sig)?;
            signature_id = sig.id;
            self.apply_accepted(&sig)?;
        }

        Ok(ActOutcome { signature_id, ..ActOutcome::default() })
    }
}
