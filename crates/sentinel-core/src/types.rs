use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};

/// A single observed data point backing a signature. `packet_size` is the
/// field every consumer cares about; `extra` carries whatever additional
/// scalar fields a detector variant wants to attach without changing the
/// wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub packet_size: f64,
    pub source_ip: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl FeatureRecord {
    pub fn new(packet_size: f64, source_ip: impl Into<String>) -> Self {
        Self {
            packet_size,
            source_ip: source_ip.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A node's claim that it observed an anomalous traffic pattern. `id` is
/// unset (`None`) until the ledger assigns one on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: Option<i64>,
    pub timestamp: f64,
    pub node_id: String,
    pub features: Vec<FeatureRecord>,
    pub confidence: f64,
}

impl Signature {
    pub fn new(timestamp: f64, node_id: impl Into<String>, features: Vec<FeatureRecord>, confidence: f64) -> Self {
        Self {
            id: None,
            timestamp,
            node_id: node_id.into(),
            features,
            confidence,
        }
    }

    /// Validates the required fields, independent of uniqueness (which
    /// only the ledger can check).
    pub fn validate(&self) -> Result<()> {
        if !self.timestamp.is_finite() {
            return Err(SentinelError::validation("timestamp must be a finite real"));
        }
        if self.node_id.trim().is_empty() {
            return Err(SentinelError::validation("nodeId must be non-empty"));
        }
        if self.features.is_empty() {
            return Err(SentinelError::validation("features must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SentinelError::validation("confidence must be in [0, 1]"));
        }
        for f in &self.features {
            if !f.packet_size.is_finite() {
                return Err(SentinelError::validation("packetSize must be a finite real"));
            }
        }
        Ok(())
    }

    /// Mean packet size across this signature's features, used by
    /// cosine-similarity validation. `None` if somehow no finite values are
    /// present (cannot happen once `validate` has passed, but callers that
    /// skip validation should still get a safe answer).
    pub fn mean_packet_size(&self) -> Option<f64> {
        if self.features.is_empty() {
            return None;
        }
        let sum: f64 = self.features.iter().map(|f| f.packet_size).sum();
        Some(sum / self.features.len() as f64)
    }
}

/// One node's vote on a signature it did not author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub signature_id: i64,
    pub is_valid: bool,
}

impl ValidationVerdict {
    pub fn new(signature_id: i64, is_valid: bool) -> Self {
        Self { signature_id, is_valid }
    }

    /// Deterministic validator id derived from the signature id.
    pub fn validator_id(signature_id: i64) -> String {
        format!("validation_{signature_id}")
    }
}

/// A blacklist record persisted per accepted signature. Shares the
/// `features`/`confidence` shape with `Signature` but is a distinct type
/// since it additionally carries the node that applied it and drops the
/// ledger id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistRecord {
    pub timestamp: f64,
    pub node_id: String,
    pub confidence: f64,
    pub features: Vec<FeatureRecord>,
}

impl From<&Signature> for BlacklistRecord {
    fn from(sig: &Signature) -> Self {
        Self {
            timestamp: sig.timestamp,
            node_id: sig.node_id.clone(),
            confidence: sig.confidence,
            features: sig.features.clone(),
        }
    }
}
