pub mod simulation;
mod strategy;

pub use simulation::{Simulation, SimulationConfig, Stats, TickMetrics};
pub use strategy::ExecutionStrategy;
