use serde::{Deserialize, Serialize};
use anyhow::Result;
use log::warn;
use crate::params::{SimParams, CONCENTRATION_MAX};
use crate::vecmath::clamp;
use std::path::Path;

// Canvas dimensions, in simulation units
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
}

// Membrane geometry and permeability
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MembraneConfig {
    pub center_x: f32,
    pub center_y: f32,
    pub initial_radius: f32,
    pub permeability: f32,
}

// Solute concentrations on either side of the membrane (percentage units)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SolutionConfig {
    pub internal_concentration: f32,
    pub external_concentration: f32,
}

// Initial molecule population split
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub inside_count: u32,
    pub outside_count: u32,
    pub placement_seed: u64,
}

// How long to run and how often to record
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_ticks: u32,
    pub record_interval_ticks: u32,
}

// Output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_positions: bool,
    pub save_stats: bool,
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

/// Main experiment configuration, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ExperimentConfig {
    /// Free-form label for the experiment (e.g. "potato_cell", "dialysis_tubing").
    #[serde(default = "default_experiment")]
    pub experiment: String,
    pub canvas: CanvasConfig,
    pub membrane: MembraneConfig,
    pub solution: SolutionConfig,
    pub population: PopulationConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
}

fn default_experiment() -> String {
    "osmosis".to_string()
}

impl ExperimentConfig {
    /// Loads the experiment configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: ExperimentConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects geometry the simulation cannot run with. Tunables that are
    /// merely out of range are clamped later in `to_sim_params`, not rejected.
    pub fn validate(&self) -> Result<()> {
        if self.canvas.width <= 0.0 || self.canvas.height <= 0.0 {
            anyhow::bail!("canvas dimensions must be positive.");
        }
        if self.membrane.initial_radius <= 0.0 {
            anyhow::bail!("membrane initial_radius must be positive.");
        }
        if self.membrane.center_x < 0.0 || self.membrane.center_x > self.canvas.width
            || self.membrane.center_y < 0.0 || self.membrane.center_y > self.canvas.height
        {
            anyhow::bail!("membrane center must lie within the canvas.");
        }
        if self.membrane.initial_radius >= self.canvas.width.min(self.canvas.height) {
            anyhow::bail!("membrane initial_radius must leave room outside the membrane.");
        }
        // A zero molecule population is valid; every derived metric degrades to zero.
        Ok(())
    }

    /// Converts the configuration into the runtime parameters used each tick.
    pub fn to_sim_params(&self) -> SimParams {
        let permeability = clamp_tunable("membrane.permeability", self.membrane.permeability, 0.0, 1.0);
        let internal = clamp_tunable(
            "solution.internal_concentration",
            self.solution.internal_concentration,
            0.0,
            CONCENTRATION_MAX,
        );
        let external = clamp_tunable(
            "solution.external_concentration",
            self.solution.external_concentration,
            0.0,
            CONCENTRATION_MAX,
        );

        SimParams {
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
            membrane_center_x: self.membrane.center_x,
            membrane_center_y: self.membrane.center_y,
            initial_cell_size: self.membrane.initial_radius,
            permeability,
            internal_concentration: internal,
            external_concentration: external,
            inside_count: self.population.inside_count,
            outside_count: self.population.outside_count,
            baseline_inside: self.population.inside_count as f32,
            placement_seed: self.population.placement_seed,
            tick: 0,
        }
    }
}

fn clamp_tunable(name: &str, value: f32, min: f32, max: f32) -> f32 {
    if !value.is_finite() {
        warn!("Config value {} is not finite ({}); using {}.", name, value, min);
        return min;
    }
    let clamped = clamp(value, min, max);
    if clamped != value {
        warn!("Config value {} = {} out of [{}, {}]; clamped to {}.", name, value, min, max, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ExperimentConfig {
        ExperimentConfig {
            experiment: "potato_cell".to_string(),
            canvas: CanvasConfig { width: 600.0, height: 500.0 },
            membrane: MembraneConfig {
                center_x: 300.0,
                center_y: 250.0,
                initial_radius: 150.0,
                permeability: 0.5,
            },
            solution: SolutionConfig {
                internal_concentration: 20.0,
                external_concentration: 10.0,
            },
            population: PopulationConfig {
                inside_count: 30,
                outside_count: 50,
                placement_seed: 42,
            },
            timing: TimingConfig { total_ticks: 1000, record_interval_ticks: 60 },
            output: OutputConfig {
                base_filename: "osmosis_run".to_string(),
                save_positions: false,
                save_stats: false,
                save_positions_in_snapshot: false,
                format: None,
            },
        }
    }

    #[test]
    fn to_sim_params_carries_geometry_and_tunables() {
        let params = base_config().to_sim_params();
        assert_eq!(params.canvas_width, 600.0);
        assert_eq!(params.initial_cell_size, 150.0);
        assert_eq!(params.permeability, 0.5);
        assert_eq!(params.baseline_inside, 30.0);
        assert_eq!(params.tick, 0);
    }

    #[test]
    fn out_of_range_tunables_are_clamped_not_rejected() {
        let mut config = base_config();
        config.membrane.permeability = 3.0;
        config.solution.external_concentration = -5.0;
        config.solution.internal_concentration = f32::NAN;
        assert!(config.validate().is_ok());

        let params = config.to_sim_params();
        assert_eq!(params.permeability, 1.0);
        assert_eq!(params.external_concentration, 0.0);
        assert_eq!(params.internal_concentration, 0.0);
    }

    #[test]
    fn validate_rejects_impossible_geometry() {
        let mut config = base_config();
        config.membrane.initial_radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.membrane.center_x = 900.0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.canvas.width = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_population_is_valid() {
        let mut config = base_config();
        config.population.inside_count = 0;
        config.population.outside_count = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_toml_document() {
        let doc = r#"
            experiment = "egg"

            [canvas]
            width = 600.0
            height = 500.0

            [membrane]
            center_x = 300.0
            center_y = 250.0
            initial_radius = 150.0
            permeability = 0.5

            [solution]
            internal_concentration = 20.0
            external_concentration = 10.0

            [population]
            inside_count = 30
            outside_count = 50
            placement_seed = 7

            [timing]
            total_ticks = 600
            record_interval_ticks = 30

            [output]
            base_filename = "egg_run"
            save_positions = true
            save_stats = true
            save_positions_in_snapshot = true
            format = "bincode"
        "#;
        let config: ExperimentConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.experiment, "egg");
        assert_eq!(config.population.placement_seed, 7);
        assert_eq!(config.output.format.as_deref(), Some("bincode"));
        assert!(config.validate().is_ok());
    }
}
