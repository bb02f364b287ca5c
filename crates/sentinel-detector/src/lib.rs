mod detector;
mod forest;
mod generator;

pub use detector::AnomalyDetector;
pub use generator::{generate_traffic, TrafficBatch};
