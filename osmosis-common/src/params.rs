use serde::{Deserialize, Serialize};

/// Upper bound for the solute concentration sliders (percentage units).
pub const CONCENTRATION_MAX: f32 = 50.0;
/// Ceiling on molecule speed, in canvas units per tick.
pub const MAX_MOLECULE_SPEED: f32 = 3.0;
/// Total span of the per-tick uniform velocity jitter (each component gets +/- half of this).
pub const VELOCITY_JITTER: f32 = 0.1;
/// Scales membrane permeability into a per-encounter crossing probability.
pub const CROSSING_FACTOR: f32 = 0.1;
/// Scales the concentration gradient into the displayed osmosis rate.
pub const OSMOSIS_RATE_FACTOR: f32 = 0.1;
/// Hard clamp range for the membrane radius as the cell swells or shrinks.
pub const CELL_SIZE_MIN: f32 = 100.0;
pub const CELL_SIZE_MAX: f32 = 200.0;
/// Membrane radius gained per molecule above the baseline inside population.
pub const CELL_SIZE_PER_MOLECULE: f32 = 2.0;
/// Exponential smoothing factor moving the radius toward its target each tick.
pub const CELL_SIZE_SMOOTHING: f32 = 0.05;
/// Concentration gradients below this magnitude count as equilibrium.
pub const EQUILIBRIUM_THRESHOLD: f32 = 1.0;
/// Rendering radius of a molecule dot. Cosmetic only.
pub const MOLECULE_RADIUS: f32 = 3.0;
/// Initial velocity components are drawn uniformly from +/- this value.
pub const INITIAL_SPEED_RANGE: f32 = 1.0;

/// Runtime simulation parameters derived from the configuration.
///
/// The solute concentrations and the membrane permeability are mutable at any
/// time through the engine's control surface; the physics step reads whatever
/// values are current at the start of each tick. Everything else is fixed
/// experiment geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Canvas bounds (molecules bounce off these edges)
    pub canvas_width: f32,
    pub canvas_height: f32,

    // Membrane geometry
    pub membrane_center_x: f32,
    pub membrane_center_y: f32,
    /// Membrane radius at t=0 and after reset().
    pub initial_cell_size: f32,

    // User-tunable experiment parameters
    /// Probability factor in [0,1] controlling how readily a molecule crosses.
    pub permeability: f32,
    /// Solute concentration inside the membrane, [0,50] percent.
    pub internal_concentration: f32,
    /// Solute concentration outside the membrane, [0,50] percent.
    pub external_concentration: f32,

    // Initial population
    pub inside_count: u32,
    pub outside_count: u32,
    /// Inside population the cell-size heuristic treats as "no excess".
    pub baseline_inside: f32,
    pub placement_seed: u64,

    /// Current simulation tick, fed into the per-molecule RNG seeds.
    pub tick: u32,
}
