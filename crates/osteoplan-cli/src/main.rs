//! Command-line planning runs: load two patient STLs, build the full
//! guide set with the configured options, and export the printable
//! artifacts.

use anyhow::{bail, Context, Result};
use clap::Parser;
use osteoplan::{ExportFlags, Planner, PlannerConfig, PlannerError, Side};
use osteoplan_mesh::stl::read_stl;
use std::path::PathBuf;
use tracing::{info, warn};

/// Generate fibula and mandible cutting/drilling guides from two
/// patient meshes.
#[derive(Parser, Debug)]
#[command(name = "osteoplan", version, about)]
struct Args {
    /// Patient fibula mesh (STL).
    fibula: PathBuf,

    /// Patient mandible mesh (STL).
    mandible: PathBuf,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of fibula segments (overrides the config file).
    #[arg(long)]
    segments: Option<usize>,

    /// Output directory for the exported STL files.
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Overwrite existing files in the output directory.
    #[arg(long)]
    overwrite: bool,

    /// Skip the positioning aid.
    #[arg(long)]
    no_positioning_aid: bool,

    /// Screw holes to drill into the fibula guide.
    #[arg(long, default_value_t = 2)]
    fibula_screws: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PlannerConfig::from_toml_str(&text)?
        }
        None => PlannerConfig::default(),
    };
    if let Some(segments) = args.segments {
        config.segment_count = segments;
        config.validate()?;
    }

    let fibula = read_stl(&args.fibula)
        .with_context(|| format!("loading fibula {}", args.fibula.display()))?;
    let mandible = read_stl(&args.mandible)
        .with_context(|| format!("loading mandible {}", args.mandible.display()))?;

    let mut planner = Planner::new(config)?;
    for warning in planner.load_inputs(fibula, mandible)? {
        warn!("{warning}");
    }

    planner.initialize_rig()?;
    planner.generate_cutting_planes()?;

    planner.create_fibula_guide()?;
    for _ in 0..args.fibula_screws {
        planner.create_fibula_screw()?;
    }

    planner.create_mandible_guides()?;
    if !args.no_positioning_aid {
        planner.create_positioning_aid()?;
    }
    planner.create_mandible_screw(Side::Start)?;
    planner.create_mandible_screw(Side::End)?;
    planner.join_mandible_guides()?;

    planner.update_now()?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;
    let report = match planner.export(&args.out, &ExportFlags::default(), args.overwrite) {
        Ok(report) => report,
        Err(PlannerError::ExportConflict(paths)) => {
            for path in &paths {
                warn!("would overwrite {}", path.display());
            }
            bail!("export aborted; pass --overwrite to replace existing files");
        }
        Err(e) => return Err(e.into()),
    };

    for path in &report.written {
        info!("wrote {}", path.display());
    }
    info!("planning run complete");
    Ok(())
}
