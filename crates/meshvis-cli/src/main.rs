//! meshvis CLI - run a surface analysis on a mesh file.
//!
//! Reads STL or OBJ, runs one analysis and writes the annotated mesh as PLY.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use meshvis_analysis::settings::{DEFAULT_CONE_ANGLE, DEFAULT_TAU};
use meshvis_analysis::{analyze, AnalysisMode, AnalysisSettings, LogProgress, SdfStatistic};
use meshvis_mesh::TriMesh;

mod obj;
mod ply;
mod stl;

#[derive(Parser, Debug)]
#[command(name = "meshvis", version)]
#[command(about = "Ray-cast visibility analyses for triangle meshes", long_about = None)]
struct Cli {
    /// Input mesh (.stl or .obj)
    input: PathBuf,

    /// Output PLY file
    #[arg(short, long)]
    output: PathBuf,

    /// Analysis to run; may be omitted when --config names a mode
    #[command(subcommand)]
    mode: Option<Mode>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Rays cast per face
    #[arg(long, global = true)]
    rays: Option<u32>,

    /// Number of worker threads
    #[arg(long, global = true, conflicts_with = "serial")]
    workers: Option<usize>,

    /// Run on the calling thread only
    #[arg(long, global = true)]
    serial: bool,

    /// Seed of the per-face sample sequences
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// TOML settings file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Mode {
    /// Distance-weighted occlusion
    Obscurance {
        /// Decay distance
        #[arg(long, default_value_t = DEFAULT_TAU)]
        tau: f64,
    },
    /// Fraction of occluded hemisphere rays
    #[command(alias = "ao")]
    AmbientOcclusion,
    /// Local thickness (shape-diameter function)
    Sdf {
        /// Cone half-angle in radians
        #[arg(long, default_value_t = DEFAULT_CONE_ANGLE)]
        cone_angle: f64,
        /// How hit distances are combined
        #[arg(long, value_enum, default_value_t = Statistic::Median)]
        statistic: Statistic,
        /// Share dropped from each end for the trimmed statistic
        #[arg(long, default_value_t = 0.1)]
        trim: f64,
    },
    /// Shadowing along a direction; visible faces are selected
    Directional {
        /// Direction towards the light, as x,y,z
        #[arg(long, value_delimiter = ',', default_values_t = [1.0, 0.0, 0.0])]
        direction: Vec<f64>,
        /// Half-angle of the jitter cone in radians
        #[arg(long, default_value_t = 0.0)]
        jitter: f64,
    },
    /// Detect and flip inward-facing faces
    Normals,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    Mean,
    Median,
    Trimmed,
}

impl Mode {
    fn to_analysis(&self) -> Result<AnalysisMode> {
        Ok(match self {
            Mode::Obscurance { tau } => AnalysisMode::Obscurance { tau: *tau },
            Mode::AmbientOcclusion => AnalysisMode::AmbientOcclusion,
            Mode::Sdf {
                cone_angle,
                statistic,
                trim,
            } => AnalysisMode::Sdf {
                cone_angle: *cone_angle,
                statistic: match statistic {
                    Statistic::Mean => SdfStatistic::Mean,
                    Statistic::Median => SdfStatistic::Median,
                    Statistic::Trimmed => SdfStatistic::TrimmedMean { fraction: *trim },
                },
            },
            Mode::Directional { direction, jitter } => {
                let [x, y, z] = direction[..] else {
                    bail!("direction needs exactly 3 components");
                };
                AnalysisMode::DirectionalVisibility {
                    direction: [x, y, z],
                    jitter: *jitter,
                }
            }
            Mode::Normals => AnalysisMode::NormalAnalysis,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.common.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings = resolve_settings(&cli)?;
    let mut mesh = load_mesh(&cli.input)?;
    log::info!(
        "loaded {} ({} vertices, {} faces)",
        cli.input.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );

    let report = analyze(&mut mesh, &settings, &mut LogProgress)?;

    let file = fs::File::create(&cli.output)
        .with_context(|| format!("cannot create {}", cli.output.display()))?;
    ply::write(&mesh, std::io::BufWriter::new(file))
        .with_context(|| format!("cannot write {}", cli.output.display()))?;

    println!("{report}");
    println!("Wrote {}", cli.output.display());
    Ok(())
}

/// Combine the config file (if any), the mode subcommand and the flags.
fn resolve_settings(cli: &Cli) -> Result<AnalysisSettings> {
    let mut settings = match (&cli.common.config, &cli.mode) {
        (Some(path), _) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str::<AnalysisSettings>(&text)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        (None, Some(_)) => AnalysisSettings::default(),
        (None, None) => bail!("no analysis mode given (use a subcommand or --config)"),
    };

    if let Some(mode) = &cli.mode {
        settings.mode = mode.to_analysis()?;
    }
    if let Some(rays) = cli.common.rays {
        settings.ray_count = rays;
    }
    if let Some(workers) = cli.common.workers {
        settings.workers = workers;
    }
    if cli.common.serial {
        settings = settings.serial();
    }
    if let Some(seed) = cli.common.seed {
        settings.seed = seed;
    }

    settings.validate()?;
    Ok(settings)
}

fn load_mesh(path: &Path) -> Result<TriMesh> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let mesh = match ext.as_str() {
        "stl" => {
            let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
            stl::parse(&bytes)
        }
        "obj" => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            obj::parse(&text)
        }
        _ => bail!("unknown input format: {ext:?} (expected .stl or .obj)"),
    };
    mesh.with_context(|| format!("cannot parse {}", path.display()))
}
