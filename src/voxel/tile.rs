//! Tile enumeration and the voxelize -> pack -> write drive loop.
//!
//! The mesh bounding box is streamed through fixed-size tiles so only one
//! occupancy grid is ever live. Each `(ix, iz)` tile column becomes one
//! region file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use glam::{UVec3, Vec3};

use crate::anvil;
use crate::bvh::Bvh;
use crate::util::{Aabb, Error, Result, Timer};

use super::kernel;

/// Largest supported tile height in voxels.
pub const MAX_HEIGHT: u32 = 256;

/// Tiling geometry derived from the mesh bounds.
///
/// The effective tile height is the mesh's voxel height rounded up to whole
/// 16-voxel sections; vertical tiling is unsupported, so a mesh taller than
/// [`MAX_HEIGHT`] must either be clamped (truncating the top) or rejected.
#[derive(Debug, Clone)]
pub struct TilePlan {
    mesh_min: Vec3,
    resolution: f32,
    extent: UVec3,
    counts: UVec3,
    mesh_height: u32,
}

impl TilePlan {
    pub fn new(mesh_aabb: Aabb, resolution: f32, tile_extent: UVec3) -> TilePlan {
        // Mesh extent in voxels, with the one-voxel safety margin the counts
        // below also rely on.
        let voxels = (mesh_aabb.size() / resolution).as_uvec3();
        let mesh_height = (voxels.y + 1).div_ceil(16) * 16;

        let extent = UVec3::new(tile_extent.x.max(16), mesh_height, tile_extent.z.max(16));
        let counts = UVec3::new(voxels.x / extent.x + 1, 1, voxels.z / extent.z + 1);

        TilePlan {
            mesh_min: mesh_aabb.min,
            resolution,
            extent,
            counts,
            mesh_height,
        }
    }

    /// Tile size in voxels.
    pub fn extent(&self) -> UVec3 {
        self.extent
    }

    /// Tiles per axis.
    pub fn counts(&self) -> UVec3 {
        self.counts
    }

    pub fn tile_count(&self) -> usize {
        (self.counts.x * self.counts.y * self.counts.z) as usize
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Does the mesh exceed the supported build height?
    pub fn over_height_cap(&self) -> bool {
        self.mesh_height > MAX_HEIGHT
    }

    /// Mesh height in voxels (rounded up to whole sections).
    pub fn mesh_height(&self) -> u32 {
        self.mesh_height
    }

    /// Truncate the tile height to [`MAX_HEIGHT`]; geometry above it is
    /// dropped.
    pub fn clamp_height(&mut self) {
        self.extent.y = self.extent.y.min(MAX_HEIGHT);
    }

    /// World-space minimum corner of tile `(ix, iy, iz)`.
    pub fn tile_min(&self, index: UVec3) -> Vec3 {
        self.mesh_min + self.extent.as_vec3() * self.resolution * index.as_vec3()
    }

    /// Decompose a linear tile index, x fastest, then y, then z.
    fn tile_index(&self, i: usize) -> UVec3 {
        let i = i as u32;
        UVec3::new(
            i % self.counts.x,
            (i / self.counts.x) % self.counts.y,
            i / (self.counts.x * self.counts.y),
        )
    }
}

/// Output configuration for a voxelization run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory receiving the `r.<x>.<z>.mca` files.
    pub out_dir: PathBuf,
    /// Block palette; index 0 is air, occupied cells reference index 1.
    pub palette: Vec<String>,
}

impl RunConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            palette: vec!["minecraft:air".to_string(), "minecraft:stone".to_string()],
        }
    }
}

/// Timing record for one processed tile.
#[derive(Debug, Clone, Copy)]
pub struct TileTiming {
    pub index: UVec3,
    pub kernel: Duration,
    pub write: Duration,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub regions: Vec<PathBuf>,
    pub timings: Vec<TileTiming>,
    pub cancelled: bool,
}

/// Drive the kernel and region writer across all tiles of `plan`.
///
/// Tiles are processed in deterministic row-major order. The cancel flag is
/// consulted between tiles only; mid-tile work is not interruptible.
pub fn run(bvh: &Bvh, plan: &TilePlan, config: &RunConfig, cancel: &AtomicBool) -> Result<RunSummary> {
    if bvh.is_empty() {
        return Err(Error::EmptyMesh);
    }
    if plan.extent.y > MAX_HEIGHT {
        return Err(Error::OverHeightCap {
            voxels: plan.mesh_height,
            cap: MAX_HEIGHT,
        });
    }

    std::fs::create_dir_all(&config.out_dir)
        .map_err(|e| Error::write_failed(&config.out_dir, e))?;

    let dims = plan.extent;
    let mut grid = vec![0u32; (dims.x * dims.y * dims.z) as usize];
    let mut summary = RunSummary::default();
    let total = plan.tile_count();
    let total_timer = Timer::start();

    for i in 0..total {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }
        let index = plan.tile_index(i);
        let _span = tracing::info_span!("tile", ix = index.x, iy = index.y, iz = index.z).entered();

        let timer = Timer::start();
        kernel::voxelize(bvh, plan.tile_min(index), plan.resolution, dims, &mut grid);
        let kernel_time = timer.report(&format!("chunk {}/{}", i + 1, total));

        let path = region_path(&config.out_dir, index.x, index.z);
        let timer = Timer::start();
        anvil::write_region(
            &path,
            index.x as i32,
            index.z as i32,
            &config.palette,
            &grid,
            dims,
        )?;
        let write_time = timer.report(&format!("MCA writing of r.{}.{}.mca", index.x, index.z));

        summary.regions.push(path);
        summary.timings.push(TileTiming {
            index,
            kernel: kernel_time,
            write: write_time,
        });
    }

    total_timer.report("Voxelization");
    Ok(summary)
}

fn region_path(out_dir: &Path, rx: u32, rz: u32) -> PathBuf {
    out_dir.join(format!("r.{rx}.{rz}.mca"))
}
