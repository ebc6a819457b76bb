//! anvilize CLI - voxelize a triangle mesh into Anvil region files.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::{env, process};

use glam::UVec3;

use anvilize::bvh::Bvh;
use anvilize::mesh::Mesh;
use anvilize::util::Timer;
use anvilize::voxel::{self, RunConfig, TilePlan, MAX_HEIGHT};

/// Verbosity level (thread-safe)
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LOG_INFO);

#[inline]
fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

macro_rules! info {
    ($($arg:tt)*) => {
        if log_level() >= LOG_INFO {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if log_level() >= LOG_DEBUG {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

struct Options {
    mesh_path: PathBuf,
    out_dir: PathBuf,
    resolution: f32,
    bvh_leaf_max: usize,
    bvh_depth_max: usize,
    max_x: u32,
    max_y: u32,
    max_z: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mesh_path: PathBuf::from("data/meshes/dragon.obj"),
            out_dir: PathBuf::from("data/region/dragons"),
            resolution: 0.0025,
            bvh_leaf_max: 64,
            bvh_depth_max: 32,
            max_x: 512,
            max_y: MAX_HEIGHT,
            max_z: 512,
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => {
                set_log_level(LOG_DEBUG);
                install_tracing();
            }
            "-q" | "--quiet" => set_log_level(LOG_QUIET),
            "-h" | "--help" => {
                print_help();
                return;
            }
            _ => filtered_args.push(arg),
        }
    }

    let opts = match parse_options(&filtered_args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!();
            print_help();
            process::exit(1);
        }
    };

    println!("OPTIONS");
    println!("\tmesh_path: \"{}\"", opts.mesh_path.display());
    println!("\tout_dir: \"{}\"", opts.out_dir.display());
    println!("\tresolution: {}", opts.resolution);
    println!("\tbvh_leaf_max: {}", opts.bvh_leaf_max);
    println!("\tbvh_depth_max: {}", opts.bvh_depth_max);
    println!(
        "\ttile_extent: ({}, {}, {})",
        opts.max_x, opts.max_y, opts.max_z
    );

    if let Err(e) = run(&opts) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn install_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn print_help() {
    println!("anvilize - triangle mesh to Anvil region files");
    println!();
    println!("USAGE:");
    println!("    anvilize [OPTIONS] [mesh] [out_dir] [resolution] [leaf_max depth_max] [max_x max_y max_z]");
    println!();
    println!("ARGS (positional, all optional):");
    println!("    mesh          triangle mesh file        [data/meshes/dragon.obj]");
    println!("    out_dir       region output directory   [data/region/dragons]");
    println!("    resolution    voxel edge length         [0.0025]");
    println!("    leaf_max      triangles per BVH leaf    [64]");
    println!("    depth_max     BVH recursion cap         [32]");
    println!("    max_*         tile extent in voxels     [512 256 512]");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output and tracing spans");
    println!("    -q, --quiet      Suppress informational output");
    println!("    -h, --help       Show this help");
}

fn parse_options(args: &[&str]) -> Result<Options, String> {
    let mut opts = Options::default();

    if !args.is_empty() {
        opts.mesh_path = PathBuf::from(args[0]);
    }
    if args.len() > 1 {
        opts.out_dir = PathBuf::from(args[1]);
    }
    if args.len() > 2 {
        opts.resolution = parse(args[2], "resolution")?;
        if opts.resolution <= 0.0 {
            return Err("resolution must be positive".to_string());
        }
    }
    // The BVH pair and the tile triple are only applied when complete
    if args.len() > 4 {
        opts.bvh_leaf_max = parse(args[3], "leaf_max")?;
        opts.bvh_depth_max = parse(args[4], "depth_max")?;
    }
    if args.len() > 7 {
        opts.max_x = parse(args[5], "max_x")?;
        opts.max_y = parse(args[6], "max_y")?;
        opts.max_z = parse(args[7], "max_z")?;
    }
    Ok(opts)
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid {name}: {value:?}"))
}

fn run(opts: &Options) -> anvilize::Result<()> {
    let timer = Timer::start();
    let mesh = Mesh::from_obj(&opts.mesh_path)?;
    timer.report("Mesh loading");
    info!(
        "{} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.triangle_count()
    );

    let timer = Timer::start();
    let bvh = Bvh::build(&mesh, opts.bvh_leaf_max, opts.bvh_depth_max);
    timer.report("BVH building");
    info!("node count: {}", bvh.nodes.len());
    debug!("mesh bounds: {:?}", bvh.root_aabb());

    let mut plan = TilePlan::new(
        bvh.root_aabb(),
        opts.resolution,
        UVec3::new(opts.max_x, opts.max_y, opts.max_z),
    );
    if plan.over_height_cap() && !confirm_clamp(&mut plan) {
        println!("Aborted.");
        return Ok(());
    }

    let extent = plan.extent();
    let counts = plan.counts();
    println!(
        "CHUNK SIZE: ({}, {}, {})",
        extent.x, extent.y, extent.z
    );
    println!(
        "TOTAL SIZE: ({}, {}, {})",
        extent.x * counts.x,
        extent.y * counts.y,
        extent.z * counts.z
    );

    let cancel = AtomicBool::new(false);
    let summary = voxel::run(&bvh, &plan, &RunConfig::new(&opts.out_dir), &cancel)?;
    info!(
        "wrote {} region file(s) to \"{}\"",
        summary.regions.len(),
        opts.out_dir.display()
    );
    Ok(())
}

/// Ask whether an over-tall mesh should be clamped; clamps silently when
/// stdin is not a terminal. Returns false to abort the run.
fn confirm_clamp(plan: &mut TilePlan) -> bool {
    println!(
        "Mesh bounding box is {} voxels tall, above the maximum {} build height !!!",
        plan.mesh_height(),
        MAX_HEIGHT
    );

    if !std::io::stdin().is_terminal() {
        plan.clamp_height();
        return true;
    }

    let stdin = std::io::stdin();
    loop {
        println!("Floor the bounding box to {MAX_HEIGHT} (f) or abort (n)?");
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        match answer.trim() {
            "f" | "F" => {
                plan.clamp_height();
                println!("Floored it");
                return true;
            }
            "n" | "N" => return false,
            _ => continue,
        }
    }
}
