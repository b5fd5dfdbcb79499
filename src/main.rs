use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::time::Instant;
use log::{info, warn, error, trace};

mod simulation;
mod state;

use osmosis_common::ExperimentConfig;
use simulation::OsmosisSimulation;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Osmosis Engine...");

    // --- Load Configuration ---
    let config = ExperimentConfig::load("config.toml")?;
    info!("Loaded experiment '{}'.", config.experiment);

    // --- Initialize Simulation ---
    let mut sim = OsmosisSimulation::new(config)?;
    info!(
        "Simulation initialized with {} molecules ({} inside / {} outside).",
        sim.molecules().len(),
        sim.inside_count(),
        sim.outside_count()
    );

    // --- Simulation Loop ---
    let total_ticks = sim.config.timing.total_ticks;
    let mut record_interval_ticks = sim.config.timing.record_interval_ticks;
    if record_interval_ticks == 0 {
        warn!("record_interval_ticks is 0; recording every tick.");
        record_interval_ticks = 1;
    }
    info!("Recording a snapshot every {} ticks.", record_interval_ticks);

    info!("Starting simulation loop for {} ticks...", total_ticks);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot (tick = 0) ---
    sim.record_snapshot();
    sim.start();

    for tick in 0..total_ticks {
        let tick_start_time = Instant::now();
        sim.step();
        let tick_duration = tick_start_time.elapsed();

        // Print status periodically, and always on record ticks
        let current_time = Instant::now();
        let print_interval_secs = 5.0;
        let should_print_status =
            current_time.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs;
        let is_record_tick = (tick + 1) % record_interval_ticks == 0;
        let is_last_tick = tick == total_ticks - 1;

        if should_print_status || is_record_tick || is_last_tick {
            info!(
                "Tick [{}/{}] | Inside: {} | Outside: {} | Rate: {:+.3} | Cell: {:6.2} | Tick Time: {:6.3} ms",
                tick + 1,
                total_ticks,
                sim.inside_count(),
                sim.outside_count(),
                sim.osmosis_rate(),
                sim.cell_size(),
                tick_duration.as_secs_f64() * 1000.0,
            );
            previous_print_time = current_time;

            if is_record_tick || is_last_tick {
                sim.record_snapshot();
            }
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.3} ms",
                tick + 1,
                total_ticks,
                tick_duration.as_secs_f64() * 1000.0
            );
        }
    }
    sim.pause();

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds. Equilibrium reached: {}.",
        total_duration.as_secs_f64(),
        sim.equilibrium_reached()
    );

    // --- Save Recorded Data ---
    if sim.config.output.save_stats {
        let output_format = sim.config.output.format.as_deref().unwrap_or("json");
        let snapshots = sim.recorded_snapshots();

        match output_format {
            "bincode" => {
                // Binary format (compact)
                let filename = format!("{}_snapshots.bin", sim.config.output.base_filename);
                match File::create(&filename) {
                    Ok(file) => match bincode::serialize_into(file, snapshots) {
                        Ok(_) => info!("All snapshots saved to {} (binary format)", filename),
                        Err(e) => error!("Error serializing snapshots to bincode: {}", e),
                    },
                    Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
                }
            }
            "messagepack" => {
                // MessagePack format (compact and cross-platform)
                let filename = format!("{}_snapshots.msgpack", sim.config.output.base_filename);
                match &mut File::create(&filename) {
                    Ok(file) => match rmp_serde::encode::write(file, snapshots) {
                        Ok(_) => info!("All snapshots saved to {} (MessagePack format)", filename),
                        Err(e) => error!("Error serializing snapshots to MessagePack: {}", e),
                    },
                    Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
                }
            }
            other => {
                if other != "json" {
                    error!("Unknown output format: {}. Using JSON instead.", other);
                }
                let filename = format!("{}_snapshots.json", sim.config.output.base_filename);
                match File::create(&filename) {
                    Ok(mut file) => match serde_json::to_string(snapshots) {
                        Ok(json_string) => {
                            if let Err(e) = file.write_all(json_string.as_bytes()) {
                                error!("Error writing snapshot JSON to file '{}': {}", filename, e);
                            } else {
                                info!("All snapshots saved to {}", filename);
                            }
                        }
                        Err(e) => error!("Error serializing snapshots to JSON: {}", e),
                    },
                    Err(e) => error!("Error creating snapshot file '{}': {}", filename, e),
                }
            }
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    // Save final molecule positions if requested (separate from full snapshots)
    if sim.config.output.save_positions {
        let filename = format!("{}_final_positions.csv", sim.config.output.base_filename);

        match csv::Writer::from_path(&filename) {
            Ok(mut writer) => {
                writer.write_record(["x", "y", "inside"])?;
                for molecule in sim.molecules() {
                    writer.write_record(&[
                        format!("{:.4}", molecule.position.x),
                        format!("{:.4}", molecule.position.y),
                        molecule.inside.to_string(),
                    ])?;
                }
                writer.flush()?;
                info!("Final positions saved to {}", filename);
            }
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Run Complete.");
    Ok(())
}
