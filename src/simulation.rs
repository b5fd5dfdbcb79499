use crate::state::{self, Molecule};
use anyhow::Result;
use log::{debug, warn};
use osmosis_common::config::ExperimentConfig;
use osmosis_common::params::{
    SimParams, CELL_SIZE_MAX, CELL_SIZE_MIN, CELL_SIZE_PER_MOLECULE, CELL_SIZE_SMOOTHING,
    CONCENTRATION_MAX, CROSSING_FACTOR, EQUILIBRIUM_THRESHOLD, MAX_MOLECULE_SPEED,
    OSMOSIS_RATE_FACTOR, VELOCITY_JITTER,
};
use osmosis_common::snapshot::{MoleculePoint, Snapshot};
use osmosis_common::vecmath::{clamp, Vec2};
use rand::prelude::*;
use rayon::prelude::*;

/// Which solution a concentration setter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionSide {
    Internal,
    External,
}

/// Manages the state and execution of the membrane diffusion experiment.
///
/// The simulation owns the single mutable state object; the physics step and
/// the explicit control-surface methods are its only writers. Everything a
/// consumer needs per tick is exposed read-only through accessors and
/// [`snapshot`](Self::snapshot).
pub struct OsmosisSimulation {
    /// The experiment configuration the simulation was built from.
    pub config: ExperimentConfig,
    /// Current runtime parameters. Concentrations and permeability are
    /// re-read here at the start of every tick, so setter calls take effect
    /// on the next tick without interrupting a running simulation.
    params: SimParams,
    molecules: Vec<Molecule>,
    /// Host-side RNG for molecule placement (initial and on reset).
    rng: StdRng,
    is_running: bool,
    tick: u32,
    // Derived quantities, recomputed after every physics pass
    inside_count: u32,
    outside_count: u32,
    cell_size: f32,
    osmosis_rate: f32,
    equilibrium_reached: bool,
    /// Stores collected snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

impl OsmosisSimulation {
    /// Creates a new simulation, validating the configuration and placing the
    /// initial molecule population.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let params = config.to_sim_params();

        let mut rng = StdRng::seed_from_u64(params.placement_seed);
        let molecules = state::initialize(&params, &mut rng);
        let inside_count = molecules.iter().filter(|m| m.inside).count() as u32;
        let outside_count = molecules.len() as u32 - inside_count;

        Ok(Self {
            cell_size: params.initial_cell_size,
            config,
            params,
            molecules,
            rng,
            is_running: false,
            tick: 0,
            inside_count,
            outside_count,
            osmosis_rate: 0.0,
            equilibrium_reached: false,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the simulation by one tick.
    ///
    /// Safe to call while paused: the state is left untouched, so stray
    /// scheduler invocations are harmless.
    pub fn step(&mut self) {
        if !self.is_running {
            return;
        }
        self.params.tick = self.tick;

        // --- 1. Advance Molecules (Parallel) ---
        self.advance_molecules();

        // --- 2. Derive Aggregate Metrics ---
        self.update_metrics();

        self.tick += 1;
    }

    /// Moves every molecule one tick: free motion, wall reflection, membrane
    /// crossing check, velocity jitter, speed clamp.
    ///
    /// Molecules never interact with each other, so the update is order
    /// independent. Each molecule draws from its own RNG seeded from
    /// (placement seed, id, tick), which keeps the run reproducible under
    /// parallel iteration.
    fn advance_molecules(&mut self) {
        let params = &self.params;
        let cell_size = self.cell_size;

        self.molecules.par_iter_mut().for_each(|molecule| {
            let seed = params
                .placement_seed
                .wrapping_add((molecule.id as u64).wrapping_mul(0x9E37_79B9))
                .wrapping_add((params.tick as u64).wrapping_mul(0x85EB_CA6B));
            let mut rng = StdRng::seed_from_u64(seed);
            integrate_molecule(molecule, params, cell_size, &mut rng);
        });
    }

    /// Recomputes the derived experiment metrics from the post-step molecule
    /// list, in dependency order: counts, gradient, osmosis rate, cell size,
    /// equilibrium flag.
    fn update_metrics(&mut self) {
        self.inside_count = self.molecules.iter().filter(|m| m.inside).count() as u32;
        self.outside_count = self.molecules.len() as u32 - self.inside_count;

        let gradient = self.params.external_concentration - self.params.internal_concentration;
        self.osmosis_rate = gradient * self.params.permeability * OSMOSIS_RATE_FACTOR;

        let target_cell_size = self.params.initial_cell_size
            + (self.inside_count as f32 - self.params.baseline_inside) * CELL_SIZE_PER_MOLECULE;
        self.cell_size += (target_cell_size - self.cell_size) * CELL_SIZE_SMOOTHING;
        self.cell_size = clamp(self.cell_size, CELL_SIZE_MIN, CELL_SIZE_MAX);

        self.equilibrium_reached = gradient.abs() < EQUILIBRIUM_THRESHOLD;
    }

    // --- Control Surface ---

    /// Resumes (or begins) the experiment from the current state.
    pub fn start(&mut self) {
        self.is_running = true;
    }

    /// Halts stepping while preserving all in-memory state, so `start` picks
    /// up exactly where the experiment left off.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Discards all motion history: stops the run, zeroes the tick counter and
    /// derived metrics, restores the membrane to its initial radius and
    /// regenerates a fresh molecule population.
    pub fn reset(&mut self) {
        self.is_running = false;
        self.tick = 0;
        self.params.tick = 0;
        self.cell_size = self.params.initial_cell_size;
        self.osmosis_rate = 0.0;
        self.equilibrium_reached = false;
        self.molecules = state::initialize(&self.params, &mut self.rng);
        self.inside_count = self.molecules.iter().filter(|m| m.inside).count() as u32;
        self.outside_count = self.molecules.len() as u32 - self.inside_count;
        debug!("Simulation reset: {} molecules placed.", self.molecules.len());
    }

    /// Sets the solute concentration on one side of the membrane, clamped to
    /// [0, 50]. Non-finite input is ignored so NaN can never leak into the
    /// physics step.
    pub fn set_concentration(&mut self, side: SolutionSide, value: f32) {
        if !value.is_finite() {
            warn!("Ignoring non-finite concentration for {:?}: {}", side, value);
            return;
        }
        let clamped = clamp(value, 0.0, CONCENTRATION_MAX);
        match side {
            SolutionSide::Internal => self.params.internal_concentration = clamped,
            SolutionSide::External => self.params.external_concentration = clamped,
        }
    }

    /// Sets the membrane permeability, clamped to [0, 1]. Non-finite input is
    /// ignored.
    pub fn set_permeability(&mut self, value: f32) {
        if !value.is_finite() {
            warn!("Ignoring non-finite permeability: {}", value);
            return;
        }
        self.params.permeability = clamp(value, 0.0, 1.0);
    }

    // --- Read-Only Projections ---

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn inside_count(&self) -> u32 {
        self.inside_count
    }

    pub fn outside_count(&self) -> u32 {
        self.outside_count
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn osmosis_rate(&self) -> f32 {
        self.osmosis_rate
    }

    pub fn equilibrium_reached(&self) -> bool {
        self.equilibrium_reached
    }

    /// Builds the exported metrics shape for the current tick.
    pub fn snapshot(&self, include_molecules: bool) -> Snapshot {
        let molecules = if include_molecules {
            Some(
                self.molecules
                    .iter()
                    .map(|m| MoleculePoint { x: m.position.x, y: m.position.y, inside: m.inside })
                    .collect(),
            )
        } else {
            None
        };
        Snapshot {
            tick: self.tick,
            inside_count: self.inside_count,
            outside_count: self.outside_count,
            osmosis_rate: self.osmosis_rate,
            cell_size: self.cell_size,
            equilibrium_reached: self.equilibrium_reached,
            molecules,
        }
    }

    /// Records the current snapshot. Should be called at record intervals.
    pub fn record_snapshot(&mut self) {
        debug!(
            "Recording snapshot at tick {} (inside {}, outside {}).",
            self.tick, self.inside_count, self.outside_count
        );
        let snapshot = self.snapshot(self.config.output.save_positions_in_snapshot);
        self.recorded_snapshots.push(snapshot);
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

/// Advances one molecule by one tick against the current parameters and
/// membrane radius.
fn integrate_molecule(molecule: &mut Molecule, params: &SimParams, cell_size: f32, rng: &mut StdRng) {
    let previous = molecule.position;
    let mut velocity = molecule.velocity;

    // --- 1. Candidate Position ---
    let mut candidate = previous.add(velocity);

    // --- 2. Wall Reflection (per axis) ---
    if candidate.x < 0.0 || candidate.x > params.canvas_width {
        velocity.x = -velocity.x;
        candidate.x = previous.x + velocity.x;
    }
    if candidate.y < 0.0 || candidate.y > params.canvas_height {
        velocity.y = -velocity.y;
        candidate.y = previous.y + velocity.y;
    }

    // --- 3. Membrane Crossing Check ---
    let center = Vec2::new(params.membrane_center_x, params.membrane_center_y);
    let was_inside = molecule.inside;
    let is_now_inside = candidate.distance(center) < cell_size;

    if was_inside == is_now_inside {
        molecule.position = candidate;
    } else if rng.random_range(0.0..1.0f32) < params.permeability * CROSSING_FACTOR {
        molecule.position = candidate;
        molecule.inside = is_now_inside;
    } else {
        // Blocked at the membrane: specular bounce off the surface normal,
        // no displacement this tick. The wall reflection above still sticks.
        let normal = previous.sub(center).normalize_or_zero();
        velocity = velocity.reflect(normal);
    }

    // --- 4. Velocity Jitter ---
    velocity.x += rng.random_range(-0.5 * VELOCITY_JITTER..0.5 * VELOCITY_JITTER);
    velocity.y += rng.random_range(-0.5 * VELOCITY_JITTER..0.5 * VELOCITY_JITTER);

    // --- 5. Speed Clamp ---
    let speed = velocity.length();
    if speed > MAX_MOLECULE_SPEED {
        velocity = velocity.scale(MAX_MOLECULE_SPEED / speed);
    }
    molecule.velocity = velocity;

    // Clamp the final position to guard against floating point drift at the edges.
    molecule.position.x = clamp(molecule.position.x, 0.0, params.canvas_width);
    molecule.position.y = clamp(molecule.position.y, 0.0, params.canvas_height);
}
