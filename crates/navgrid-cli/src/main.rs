//! CLI utility for baking ASCII obstacle maps and querying the result

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec2;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use navgrid::{BakeStage, BuildContext, Grid, NavMeshConfig, PathMode, SimplificationMode};
use navgrid_query::{NavMesh, NavMeshQuery};

/// A CLI utility for navgrid navigation mesh baking and pathfinding
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct BakeArgs {
    /// Cell size in world units; one map character covers one cell
    #[clap(long, default_value = "0.5")]
    cell_size: f32,

    /// Agent radius used to grow obstacles
    #[clap(long, default_value = "0.5")]
    agent_radius: f32,

    /// Contour simplification
    #[clap(long, value_enum, default_value_t = Simplification::DouglasPeucker)]
    simplification: Simplification,

    /// Maximum deviation in world units when decimating
    #[clap(long, default_value = "1.0")]
    max_distance: f32,

    /// Maximum number of regions to label
    #[clap(long, default_value = "255")]
    max_regions: u16,

    /// Search cost model
    #[clap(long, value_enum, default_value_t = Mode::PolygonCenter)]
    path_mode: Mode,

    /// Keep raw corridor waypoints instead of string-pulling them
    #[clap(long)]
    no_funnel: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Simplification {
    None,
    DouglasPeucker,
    Decimation,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    PolygonCenter,
    MidEdge,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bake a navigation mesh from an ASCII map ('#' marks obstacles)
    Bake {
        /// Input map file
        #[clap(long, value_parser)]
        input: PathBuf,

        /// Output navigation mesh file (JSON)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,

        #[clap(flatten)]
        bake: BakeArgs,
    },

    /// Find a path on a baked mesh or an ASCII map
    FindPath {
        /// Navigation mesh (.json) or ASCII map
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Start position (x,y)
        #[clap(long, value_parser = parse_vector)]
        start: Vec2,

        /// End position (x,y)
        #[clap(long, value_parser = parse_vector)]
        end: Vec2,

        /// Output path file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,

        #[clap(flatten)]
        bake: BakeArgs,
    },

    /// Cast a ray across a baked mesh or an ASCII map
    Raycast {
        /// Navigation mesh (.json) or ASCII map
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Ray origin (x,y)
        #[clap(long, value_parser = parse_vector)]
        origin: Vec2,

        /// Ray direction (x,y)
        #[clap(long, value_parser = parse_vector)]
        direction: Vec2,

        /// Ray length
        #[clap(long, default_value = "10.0")]
        max_distance: f32,

        #[clap(flatten)]
        bake: BakeArgs,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec2, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 2 {
        return Err(format!(
            "Vector must have 2 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec2::new(x, y))
}

impl BakeArgs {
    fn config(&self) -> NavMeshConfig {
        NavMeshConfig {
            cell_size: self.cell_size,
            agent_radius: self.agent_radius,
            max_regions: self.max_regions,
            simplification: match self.simplification {
                Simplification::None => SimplificationMode::None,
                Simplification::DouglasPeucker => SimplificationMode::DouglasPeucker,
                Simplification::Decimation => SimplificationMode::Decimation {
                    max_distance: self.max_distance,
                },
            },
            path_mode: match self.path_mode {
                Mode::PolygonCenter => PathMode::PolygonCenter,
                Mode::MidEdge => PathMode::MidEdge,
            },
            use_funnel: !self.no_funnel,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Bake {
            input,
            output,
            bake,
        } => bake_map(&input, output.as_deref(), &bake),
        Commands::FindPath {
            mesh,
            start,
            end,
            output,
            bake,
        } => find_path(&mesh, start, end, output.as_deref(), &bake),
        Commands::Raycast {
            mesh,
            origin,
            direction,
            max_distance,
            bake,
        } => raycast(&mesh, origin, direction, max_distance, &bake),
    }
}

/// Bake an ASCII map, printing the build log and timings
fn bake_from_file(input: &Path, args: &BakeArgs) -> Result<NavMesh> {
    println!("Loading map from {}...", input.display());
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read map: {}", input.display()))?;

    let config = args.config();
    let grid = Grid::from_ascii(&text, config.cell_size, Vec2::ZERO)
        .map_err(|e| anyhow!("Failed to parse map: {}", e))?;
    println!("Grid size: {}x{}", grid.width, grid.height);

    let mut ctx = BuildContext::new();
    let nav_mesh = NavMesh::bake_grid(&mut ctx, config, grid)
        .map_err(|e| anyhow!("Failed to bake navigation mesh: {}", e))?;

    for warning in ctx.warnings() {
        println!("warning: {}", warning.message);
    }
    if let Some(total) = ctx.get_timer_duration(BakeStage::Total) {
        println!("Bake took {:.2?}", total);
    }
    print!("{}", ctx.timer_summary());

    let stats = nav_mesh.stats();
    println!(
        "Navigation mesh baked: {} regions, {} polygons, {} vertices, {} triangles, {} flips",
        stats.region_count,
        stats.polygon_count,
        stats.vertex_count,
        stats.triangle_count,
        stats.delaunay_flips
    );

    Ok(nav_mesh)
}

/// Load a baked mesh from JSON or bake an ASCII map, based on the extension
fn load_or_bake(path: &Path, args: &BakeArgs) -> Result<NavMesh> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        load(path)
    } else {
        bake_from_file(path, args)
    }
}

#[cfg(feature = "serialization")]
fn load(path: &Path) -> Result<NavMesh> {
    println!("Loading navigation mesh from {}...", path.display());
    NavMesh::load_from_json(path).map_err(|e| anyhow!("Failed to load JSON navigation mesh: {}", e))
}

#[cfg(not(feature = "serialization"))]
fn load(_path: &Path) -> Result<NavMesh> {
    bail!("Loading JSON meshes requires the serialization feature")
}

fn bake_map(input: &Path, output: Option<&Path>, args: &BakeArgs) -> Result<()> {
    let nav_mesh = bake_from_file(input, args)?;

    for (i, region) in nav_mesh.regions().iter().enumerate() {
        println!(
            "Region {}: {} cells, {} polygons, {} holes",
            i,
            region.cell_count,
            region.mesh.polygons.len(),
            region.holes.len()
        );
    }

    if let Some(output) = output {
        save(&nav_mesh, output)?;
    }

    Ok(())
}

#[cfg(feature = "serialization")]
fn save(nav_mesh: &NavMesh, output: &Path) -> Result<()> {
    println!("Saving navigation mesh to {}...", output.display());
    nav_mesh
        .save_to_json(output)
        .map_err(|e| anyhow!("Failed to save as JSON: {}", e))
}

#[cfg(not(feature = "serialization"))]
fn save(_nav_mesh: &NavMesh, _output: &Path) -> Result<()> {
    bail!("Saving meshes requires the serialization feature")
}

/// Find a path on a navigation mesh
fn find_path(
    mesh_path: &Path,
    start: Vec2,
    end: Vec2,
    output: Option<&Path>,
    args: &BakeArgs,
) -> Result<()> {
    let nav_mesh = load_or_bake(mesh_path, args)?;
    let query = NavMeshQuery::new(&nav_mesh);

    println!("Finding path from {:?} to {:?}...", start, end);
    let path = query.plan_path(start, end, None);
    if !path.is_full() {
        bail!("No path between {:?} and {:?}", start, end);
    }

    println!(
        "Found path with {} polygons, {} waypoints, length {:.3}",
        path.polygons.len(),
        path.waypoints.len(),
        path.length()
    );

    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        writeln!(file, "# Path from {:?} to {:?}", start, end)?;
        writeln!(file, "# {} waypoints", path.waypoints.len())?;

        for waypoint in &path.waypoints {
            writeln!(file, "{},{}", waypoint.x, waypoint.y)?;
        }
    } else {
        println!("Path:");
        for (i, waypoint) in path.waypoints.iter().enumerate() {
            println!("{}: {},{}", i, waypoint.x, waypoint.y);
        }
    }

    Ok(())
}

fn raycast(
    mesh_path: &Path,
    origin: Vec2,
    direction: Vec2,
    max_distance: f32,
    args: &BakeArgs,
) -> Result<()> {
    let nav_mesh = load_or_bake(mesh_path, args)?;
    let query = NavMeshQuery::new(&nav_mesh);

    let (region, hit) = query
        .raycast_vector(origin, direction, max_distance, None)
        .ok_or_else(|| anyhow!("Navigation mesh is empty"))?;

    println!(
        "{} at {},{} (region {}, polygon {}, t = {:.3})",
        if hit.blocked { "Blocked" } else { "Clear" },
        hit.point.x,
        hit.point.y,
        region,
        hit.polygon,
        hit.t
    );

    Ok(())
}
