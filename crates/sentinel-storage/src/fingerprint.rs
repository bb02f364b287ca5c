use sentinel_core::Signature;
use twox_hash::XxHash64;
use std::hash::Hasher;

/// Content hash over a signature's salient fields, used as the
/// `ValidationCache` key. Includes the sorted packet-size values plus
/// `nodeId` and `confidence` rounded to two decimal places, so two
/// signatures with the same underlying observations but floating-point
/// noise in their confidence still fingerprint identically.
pub fn fingerprint(sig: &Signature) -> u64 {
    let mut sizes: Vec<i64> = sig.features.iter().map(|f| (f.packet_size * 1000.0).round() as i64).collect();
    sizes.sort_unstable();

    let mut hasher = XxHash64::with_seed(0);
    for size in &sizes {
        hasher.write_i64(*size);
    }
    hasher.write(sig.node_id.as_bytes());
    hasher.write_i64((sig.confidence * 100.0).round() as i64);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::FeatureRecord;

    #[test]
    fn fingerprint_is_stable_for_identical_input() {
        let sig = Signature::new(1.0, "Node_1", vec![FeatureRecord::new(100.0, "a")], 0.5);
        assert_eq!(fingerprint(&sig), fingerprint(&sig));
    }

    #[test]
    fn fingerprint_is_order_independent_over_feature_order() {
        let a = Signature::new(
            1.0,
            "Node_1",
            vec![FeatureRecord::new(100.0, "a"), FeatureRecord::new(200.0, "b")],
            0.5,
        );
        let b = Signature::new(
            1.0,
            "Node_1",
            vec![FeatureRecord::new(200.0, "b"), FeatureRecord::new(100.0, "a")],
            0.5,
        );
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_for_different_node() {
        let a = Signature::new(1.0, "Node_1", vec![FeatureRecord::new(100.0, "a")], 0.5);
        let b = Signature::new(1.0, "Node_2", vec![FeatureRecord::new(100.0, "a")], 0.5);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
