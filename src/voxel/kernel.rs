//! Occupancy kernel: fills a dense tile grid from the BVH.
//!
//! Surface-shell voxelization. A cell is occupied when its cube overlaps a
//! mesh triangle; interior cells are not filled.

use glam::{UVec3, Vec3};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::bvh::Bvh;
use crate::util::Aabb;

/// Fill `grid` with the occupancy of one tile.
///
/// Cell `(x, y, z)` maps to `grid[x + y*dims.x + z*dims.x*dims.y]` and covers
/// the cube of side `resolution` centered at
/// `tile_min + (x + 0.5, y + 0.5, z + 0.5) * resolution`.
///
/// Every cell is written (1 on overlap, 0 otherwise), so the shared grid
/// needs no separate clear between tiles. Workers own disjoint x-rows and
/// read the BVH without synchronization.
pub fn voxelize(bvh: &Bvh, tile_min: Vec3, resolution: f32, dims: UVec3, grid: &mut [u32]) {
    let (wx, wy) = (dims.x as usize, dims.y as usize);
    assert_eq!(grid.len(), wx * wy * dims.z as usize);

    let half = Vec3::splat(resolution * 0.5);
    grid.par_chunks_mut(wx).enumerate().for_each(|(row, cells)| {
        let y = (row % wy) as f32;
        let z = (row / wy) as f32;
        for (x, cell) in cells.iter_mut().enumerate() {
            let center = tile_min + (Vec3::new(x as f32, y, z) + 0.5) * resolution;
            *cell = cell_occupied(bvh, center, half) as u32;
        }
    });
}

/// Test one cell cube against the BVH, depth-first.
fn cell_occupied(bvh: &Bvh, center: Vec3, half: Vec3) -> bool {
    let cell = Aabb::new(center - half, center + half);

    let mut stack: SmallVec<[u32; 64]> = SmallVec::new();
    stack.push(Bvh::ROOT);
    while let Some(index) = stack.pop() {
        let node = &bvh.nodes[index as usize];
        if !node.aabb.overlaps(&cell) {
            continue;
        }
        if node.is_leaf() {
            for tri in bvh.leaf_triangles(node) {
                if triangle_box_overlap(
                    center,
                    half,
                    tri.vertices[0].position,
                    tri.vertices[1].position,
                    tri.vertices[2].position,
                ) {
                    return true;
                }
            }
        } else {
            // `0` is the none sentinel (empty root)
            if node.left != 0 {
                stack.push(node.left);
            }
            if node.right != 0 {
                stack.push(node.right);
            }
        }
    }
    false
}

/// Separating-axis triangle/box overlap: 9 edge cross products, the 3 box
/// axes, and the triangle plane.
fn triangle_box_overlap(box_center: Vec3, box_half: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> bool {
    let v0 = v0 - box_center;
    let v1 = v1 - box_center;
    let v2 = v2 - box_center;

    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let e2 = v0 - v2;

    let axes = [
        Vec3::new(0.0, -e0.z, e0.y),
        Vec3::new(0.0, -e1.z, e1.y),
        Vec3::new(0.0, -e2.z, e2.y),
        Vec3::new(e0.z, 0.0, -e0.x),
        Vec3::new(e1.z, 0.0, -e1.x),
        Vec3::new(e2.z, 0.0, -e2.x),
        Vec3::new(-e0.y, e0.x, 0.0),
        Vec3::new(-e1.y, e1.x, 0.0),
        Vec3::new(-e2.y, e2.x, 0.0),
    ];

    for axis in axes.iter() {
        let p0 = v0.dot(*axis);
        let p1 = v1.dot(*axis);
        let p2 = v2.dot(*axis);
        let min_p = p0.min(p1.min(p2));
        let max_p = p0.max(p1.max(p2));
        let r = box_half.x * axis.x.abs() + box_half.y * axis.y.abs() + box_half.z * axis.z.abs();
        if min_p > r || max_p < -r {
            return false;
        }
    }

    if v0.x.min(v1.x.min(v2.x)) > box_half.x
        || v0.x.max(v1.x.max(v2.x)) < -box_half.x
        || v0.y.min(v1.y.min(v2.y)) > box_half.y
        || v0.y.max(v1.y.max(v2.y)) < -box_half.y
        || v0.z.min(v1.z.min(v2.z)) > box_half.z
        || v0.z.max(v1.z.max(v2.z)) < -box_half.z
    {
        return false;
    }

    let normal = e0.cross(e1);
    let dist = normal.dot(v0);
    let r = box_half.x * normal.x.abs() + box_half.y * normal.y.abs() + box_half.z * normal.z.abs();
    dist.abs() <= r
}
