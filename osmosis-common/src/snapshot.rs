use serde::{Serialize, Deserialize};

/// Position and membrane side of one molecule, as recorded for rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoleculePoint {
    pub x: f32,
    pub y: f32,
    /// True when the molecule is classified inside the membrane.
    pub inside: bool,
}

/// The aggregate metrics exported after each tick.
///
/// This is the full contract between the simulation core and any consumer
/// (visualizer, reporting): everything a frame needs is here, and nothing in
/// here feeds back into the physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The tick at which the snapshot was taken.
    pub tick: u32,
    /// Number of molecules currently inside the membrane.
    pub inside_count: u32,
    /// Number of molecules currently outside the membrane.
    pub outside_count: u32,
    /// Signed net-flow heuristic; positive means net inward flow.
    pub osmosis_rate: f32,
    /// Current membrane radius after smoothing and clamping.
    pub cell_size: f32,
    /// True when the concentration gradient has dropped below the equilibrium threshold.
    pub equilibrium_reached: bool,
    /// Per-molecule positions, included only when the config asks for them.
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "molecules": null
    pub molecules: Option<Vec<MoleculePoint>>,
}
