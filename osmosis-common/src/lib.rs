pub mod config;
pub mod params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    ExperimentConfig, CanvasConfig, MembraneConfig, SolutionConfig, PopulationConfig,
    TimingConfig, OutputConfig,
};
pub use params::SimParams;
pub use snapshot::{MoleculePoint, Snapshot};
pub use vecmath::{Vec2, clamp};
