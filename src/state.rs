use osmosis_common::params::{SimParams, INITIAL_SPEED_RANGE, MOLECULE_RADIUS};
use osmosis_common::vecmath::Vec2;
use rand::prelude::*;

/// A single water molecule tracked by the simulation.
#[derive(Debug, Clone, Copy)]
pub struct Molecule {
    /// Sequential id, assigned at initialization and stable for the run.
    /// Feeds the per-molecule RNG seed during the physics step.
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// True when the molecule is classified inside the membrane.
    pub inside: bool,
    /// Rendering radius. Cosmetic only.
    pub radius: f32,
}

/// Places the initial molecule population: `inside_count` molecules at random
/// angle/radius within the membrane disk, `outside_count` molecules rejection-
/// sampled over the canvas until they land outside the disk. Velocities get
/// uniform components in +/- `INITIAL_SPEED_RANGE`.
///
/// This is the only way molecules come into existence; all later state changes
/// are produced by the physics step.
pub fn initialize(params: &SimParams, rng: &mut StdRng) -> Vec<Molecule> {
    let center = Vec2::new(params.membrane_center_x, params.membrane_center_y);
    let cell_radius = params.initial_cell_size;
    let total = (params.inside_count + params.outside_count) as usize;
    let mut molecules = Vec::with_capacity(total);

    for id in 0..params.inside_count {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let radius = rng.random_range(0.0..cell_radius);
        let position = center.add(Vec2::new(angle.cos(), angle.sin()).scale(radius));
        molecules.push(Molecule {
            id,
            position,
            velocity: random_velocity(rng),
            inside: true,
            radius: MOLECULE_RADIUS,
        });
    }

    for id in params.inside_count..params.inside_count + params.outside_count {
        // Retry point selection until outside the forbidden disk.
        let position = loop {
            let candidate = Vec2::new(
                rng.random_range(0.0..params.canvas_width),
                rng.random_range(0.0..params.canvas_height),
            );
            if candidate.distance(center) >= cell_radius {
                break candidate;
            }
        };
        molecules.push(Molecule {
            id,
            position,
            velocity: random_velocity(rng),
            inside: false,
            radius: MOLECULE_RADIUS,
        });
    }

    molecules
}

fn random_velocity(rng: &mut StdRng) -> Vec2 {
    Vec2::new(
        rng.random_range(-INITIAL_SPEED_RANGE..INITIAL_SPEED_RANGE),
        rng.random_range(-INITIAL_SPEED_RANGE..INITIAL_SPEED_RANGE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmosis_common::params::MAX_MOLECULE_SPEED;

    fn test_params() -> SimParams {
        SimParams {
            canvas_width: 600.0,
            canvas_height: 500.0,
            membrane_center_x: 300.0,
            membrane_center_y: 250.0,
            initial_cell_size: 150.0,
            permeability: 0.5,
            internal_concentration: 20.0,
            external_concentration: 10.0,
            inside_count: 30,
            outside_count: 50,
            baseline_inside: 30.0,
            placement_seed: 42,
            tick: 0,
        }
    }

    #[test]
    fn initialize_splits_population_by_side() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(params.placement_seed);
        let molecules = initialize(&params, &mut rng);

        assert_eq!(molecules.len(), 80);
        assert_eq!(molecules.iter().filter(|m| m.inside).count(), 30);

        let center = Vec2::new(params.membrane_center_x, params.membrane_center_y);
        for molecule in &molecules {
            // The side flag must agree with the geometry it was placed by.
            let geometrically_inside = molecule.position.distance(center) < params.initial_cell_size;
            assert_eq!(molecule.inside, geometrically_inside, "molecule {}", molecule.id);
            assert!(molecule.position.x >= 0.0 && molecule.position.x <= params.canvas_width);
            assert!(molecule.position.y >= 0.0 && molecule.position.y <= params.canvas_height);
            assert!(molecule.velocity.length() <= MAX_MOLECULE_SPEED);
        }
    }

    #[test]
    fn initialize_assigns_sequential_ids() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(1);
        let molecules = initialize(&params, &mut rng);
        for (expected, molecule) in molecules.iter().enumerate() {
            assert_eq!(molecule.id, expected as u32);
        }
    }

    #[test]
    fn initialize_is_reproducible_for_a_fixed_seed() {
        let params = test_params();
        let a = initialize(&params, &mut StdRng::seed_from_u64(9));
        let b = initialize(&params, &mut StdRng::seed_from_u64(9));
        for (ma, mb) in a.iter().zip(b.iter()) {
            assert_eq!(ma.position, mb.position);
            assert_eq!(ma.velocity, mb.velocity);
        }
    }

    #[test]
    fn initialize_handles_empty_population() {
        let mut params = test_params();
        params.inside_count = 0;
        params.outside_count = 0;
        let molecules = initialize(&params, &mut StdRng::seed_from_u64(0));
        assert!(molecules.is_empty());
    }
}
