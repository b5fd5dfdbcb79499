use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use rayon::prelude::*;
use osmosis_common::params::MOLECULE_RADIUS;
use osmosis_common::{ExperimentConfig, Snapshot};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file path (.bin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the rendered PNG frames
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Width of the output frames in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Height of the output frames in pixels (calculated from aspect ratio if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Optional path to the config.toml file to get exact canvas dimensions
    #[arg(long)]
    config: Option<PathBuf>,

    /// Canvas width in simulation units (used if config is not provided)
    #[arg(long, default_value_t = 600.0)]
    canvas_width: f32,

    /// Canvas height in simulation units (used if config is not provided)
    #[arg(long, default_value_t = 500.0)]
    canvas_height: f32,

    /// Color for molecules inside the membrane
    #[arg(long, default_value = "blue")]
    inside_color: String,

    /// Color for molecules outside the membrane
    #[arg(long, default_value = "red")]
    outside_color: String,

    /// Color for the membrane outline
    #[arg(long, default_value = "black")]
    membrane_color: String,

    /// Background color
    #[arg(long, default_value = "white")]
    bg_color: String,
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [220, 60, 60, 255]),
    ("green", [60, 180, 90, 255]),
    ("blue", [70, 110, 230, 255]),
    ("yellow", [230, 200, 50, 255]),
    ("cyan", [70, 200, 220, 255]),
    ("magenta", [200, 80, 200, 255]),
];

/// Parse a color name to RGBA values
fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    // Default to black if color not found
    warn!("Color '{}' not recognized, using black.", color_name);
    [0, 0, 0, 255]
}

/// Colors resolved once from the CLI arguments
struct FrameColors {
    inside: Rgba<u8>,
    outside: Rgba<u8>,
    membrane: Rgba<u8>,
    background: Rgba<u8>,
}

/// Draw one snapshot: background, membrane circle at the recorded radius,
/// one dot per molecule colored by side.
fn draw_frame(
    snapshot: &Snapshot,
    width: u32,
    height: u32,
    pixels_per_unit: f32,
    membrane_center: (f32, f32),
    colors: &FrameColors,
) -> RgbaImage {
    let mut image = ImageBuffer::from_pixel(width, height, colors.background);

    // Membrane outline at the current cell size
    let cx = (membrane_center.0 * pixels_per_unit).round() as i32;
    let cy = (membrane_center.1 * pixels_per_unit).round() as i32;
    let membrane_radius_px = (snapshot.cell_size * pixels_per_unit).round() as i32;
    draw_hollow_circle_mut(&mut image, (cx, cy), membrane_radius_px, colors.membrane);

    if let Some(molecules) = &snapshot.molecules {
        let dot_radius_px = ((MOLECULE_RADIUS * pixels_per_unit).round() as i32).max(1);
        for molecule in molecules {
            let px = (molecule.x * pixels_per_unit).round() as i32;
            let py = (molecule.y * pixels_per_unit).round() as i32;
            if px >= 0 && px < width as i32 && py >= 0 && py < height as i32 {
                let color = if molecule.inside { colors.inside } else { colors.outside };
                draw_filled_circle_mut(&mut image, (px, py), dot_radius_px, color);
            }
        }
    }

    image
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting Osmosis Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output.display());

    // --- Determine Canvas Dimensions ---
    let (canvas_width, canvas_height, membrane_center) = if let Some(config_path) = &args.config {
        match ExperimentConfig::load(config_path) {
            Ok(config) => {
                info!("Loaded canvas dimensions from {}", config_path.display());
                (
                    config.canvas.width,
                    config.canvas.height,
                    (config.membrane.center_x, config.membrane.center_y),
                )
            }
            Err(e) => {
                warn!(
                    "Failed to load config file '{}': {}. Using provided dimensions.",
                    config_path.display(),
                    e
                );
                (args.canvas_width, args.canvas_height, (args.canvas_width / 2.0, args.canvas_height / 2.0))
            }
        }
    } else {
        info!("Using provided canvas dimensions.");
        (args.canvas_width, args.canvas_height, (args.canvas_width / 2.0, args.canvas_height / 2.0))
    };

    // --- Calculate Output Dimensions and Scale ---
    let output_width_px = args.width;
    let aspect_ratio = canvas_width / canvas_height;
    let output_height_px = args.height.unwrap_or_else(|| (output_width_px as f32 / aspect_ratio) as u32);

    let scale_x = output_width_px as f32 / canvas_width;
    let scale_y = output_height_px as f32 / canvas_height;
    let pixels_per_unit = scale_x.min(scale_y); // Use smaller scale to ensure everything fits

    info!("Frame dimensions: {}x{} px", output_width_px, output_height_px);
    info!("Scale: {:.4} pixels per canvas unit", pixels_per_unit);

    // --- Set up Colors ---
    let colors = FrameColors {
        inside: Rgba(parse_color(&args.inside_color)),
        outside: Rgba(parse_color(&args.outside_color)),
        membrane: Rgba(parse_color(&args.membrane_color)),
        background: Rgba(parse_color(&args.bg_color)),
    };

    // --- Load Snapshots ---
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open snapshot file {}", args.input.display()))?;
    let snapshots: Vec<Snapshot> = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("Failed to decode snapshots from {}", args.input.display()))?;
    info!("Loaded {} snapshots.", snapshots.len());

    if snapshots.iter().all(|s| s.molecules.is_none()) {
        warn!("Snapshots carry no molecule positions (save_positions_in_snapshot was off); frames will only show the membrane.");
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    // --- Render Frames (Parallel) ---
    let progress_bar = ProgressBar::new(snapshots.len() as u64);
    progress_bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} frames")
            .expect("static progress template is valid"),
    );

    let start_time = Instant::now();
    let results: Result<Vec<()>> = snapshots
        .par_iter()
        .enumerate()
        .progress_with(progress_bar)
        .map(|(index, snapshot)| {
            let image = draw_frame(
                snapshot,
                output_width_px,
                output_height_px,
                pixels_per_unit,
                membrane_center,
                &colors,
            );
            let path = args.output.join(format!("frame_{:05}.png", index));
            image
                .save(&path)
                .with_context(|| format!("Failed to write frame {}", path.display()))
        })
        .collect();
    results?;

    let duration = start_time.elapsed();
    info!(
        "Rendered {} frames in {:.2?} ({:.1} frames per second)",
        snapshots.len(),
        duration,
        snapshots.len() as f64 / duration.as_secs_f64()
    );
    info!("Frames saved to: {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_resolves_names_case_insensitively() {
        assert_eq!(parse_color("White"), [255, 255, 255, 255]);
        assert_eq!(parse_color("BLACK"), [0, 0, 0, 255]);
    }

    #[test]
    fn parse_color_falls_back_to_black() {
        assert_eq!(parse_color("mauve"), [0, 0, 0, 255]);
    }

    #[test]
    fn draw_frame_marks_molecules_by_side() {
        let colors = FrameColors {
            inside: Rgba([70, 110, 230, 255]),
            outside: Rgba([220, 60, 60, 255]),
            membrane: Rgba([0, 0, 0, 255]),
            background: Rgba([255, 255, 255, 255]),
        };
        let snapshot = Snapshot {
            tick: 0,
            inside_count: 1,
            outside_count: 1,
            osmosis_rate: 0.0,
            cell_size: 150.0,
            equilibrium_reached: false,
            molecules: Some(vec![
                osmosis_common::MoleculePoint { x: 300.0, y: 250.0, inside: true },
                osmosis_common::MoleculePoint { x: 30.0, y: 30.0, inside: false },
            ]),
        };
        let image = draw_frame(&snapshot, 600, 500, 1.0, (300.0, 250.0), &colors);
        assert_eq!(image.get_pixel(300, 250), &colors.inside);
        assert_eq!(image.get_pixel(30, 30), &colors.outside);
        assert_eq!(image.get_pixel(1, 1), &colors.background);
    }
}
