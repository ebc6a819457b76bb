//! # anvilize
//!
//! Converts a triangle mesh into a voxel occupancy grid and writes the
//! result as Minecraft Anvil region files (`.mca`).
//!
//! The pipeline streams the mesh bounding box through fixed-size tiles so
//! only one occupancy grid is live at a time:
//!
//! mesh -> BVH -> (per tile) kernel -> occupancy grid -> packed sections
//! -> chunk NBT -> zlib -> region file
//!
//! ## Modules
//!
//! - [`util`] - errors, math primitives, phase timers
//! - [`mesh`] - mesh types and OBJ loading
//! - [`bvh`] - bounding volume hierarchy over triangles
//! - [`voxel`] - occupancy kernel and tile scheduler
//! - [`anvil`] - NBT, section packing, region files
//!
//! ## Example
//!
//! ```ignore
//! use anvilize::{bvh::Bvh, mesh::Mesh, voxel};
//! use std::sync::atomic::AtomicBool;
//!
//! let mesh = Mesh::from_obj("dragon.obj")?;
//! let bvh = Bvh::build(&mesh, 64, 32);
//! let plan = voxel::TilePlan::new(bvh.root_aabb(), 0.0025, glam::UVec3::new(512, 256, 512));
//! voxel::run(&bvh, &plan, &voxel::RunConfig::new("out"), &AtomicBool::new(false))?;
//! ```

pub mod anvil;
pub mod bvh;
pub mod mesh;
pub mod util;
pub mod voxel;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anvil::{read_region, write_region};
    pub use crate::bvh::Bvh;
    pub use crate::mesh::{Mesh, Triangle, Vertex};
    pub use crate::util::{Aabb, Error, Result, Timer};
    pub use crate::voxel::{RunConfig, TilePlan};
}
