pub mod error;
pub mod rng;
pub mod types;

pub use error::{Result, SentinelError};
pub use types::{BlacklistRecord, FeatureRecord, Signature, ValidationVerdict};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_rejects_empty_node_id() {
        let sig = Signature::new(1.0, "", vec![FeatureRecord::new(100.0, "10.0.0.1")], 0.5);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn signature_rejects_confidence_out_of_range() {
        let sig = Signature::new(1.0, "Node_1", vec![FeatureRecord::new(100.0, "10.0.0.1")], 1.5);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn signature_rejects_empty_features() {
        let sig = Signature::new(1.0, "Node_1", vec![], 0.5);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn signature_rejects_non_finite_timestamp() {
        let sig = Signature::new(f64::NAN, "Node_1", vec![FeatureRecord::new(100.0, "10.0.0.1")], 0.5);
        assert!(sig.validate().is_err());
    }

    #[test]
    fn signature_accepts_well_formed_input() {
        let sig = Signature::new(1.0, "Node_1", vec![FeatureRecord::new(100.0, "10.0.0.1")], 0.5);
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn validator_id_is_deterministic() {
        assert_eq!(ValidationVerdict::validator_id(42), "validation_42");
        assert_eq!(ValidationVerdict::validator_id(42), ValidationVerdict::validator_id(42));
    }

    #[test]
    fn mean_packet_size_averages_features() {
        let sig = Signature::new(
            1.0,
            "Node_1",
            vec![FeatureRecord::new(100.0, "a"), FeatureRecord::new(200.0, "b")],
            0.5,
        );
        assert_eq!(sig.mean_packet_size(), Some(150.0));
    }

    #[test]
    fn node_rng_differs_per_index() {
        use rand::RngCore;
        let mut a = rng::node_rng(Some(7), 0);
        let mut b = rng::node_rng(Some(7), 1);
        assert_ne!(a.next_u64(), b.next_u64());
    }
}
