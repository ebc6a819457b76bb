//! Triangle mesh input types and OBJ loading.
//!
//! Only vertex positions enter the voxelization core; colors, normals and
//! uvs are rendering concerns and are dropped at load time.

use std::path::Path;

use crate::util::{Aabb, Error, Result, Vec3};

/// Mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

/// Triangle materialized from the mesh vertex array.
///
/// The BVH owns a permuted copy of these so that leaf ranges stay contiguous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            vertices: [Vertex::new(a), Vertex::new(b), Vertex::new(c)],
        }
    }

    /// Bounding box of the three vertices.
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::from_point(self.vertices[0].position);
        aabb.expand_by_point(self.vertices[1].position);
        aabb.expand_by_point(self.vertices[2].position);
        aabb
    }
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Flat triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        debug_assert_eq!(indices.len() % 3, 0);
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Materialize triangle `i` from the vertex array.
    pub fn triangle(&self, i: usize) -> Triangle {
        Triangle {
            vertices: [
                self.vertices[self.indices[i * 3] as usize],
                self.vertices[self.indices[i * 3 + 1] as usize],
                self.vertices[self.indices[i * 3 + 2] as usize],
            ],
        }
    }

    /// Iterate over all triangles in index order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(|i| self.triangle(i))
    }

    /// Load a mesh from a Wavefront OBJ file.
    ///
    /// Faces are triangulated at load. Only the first model in the file is
    /// used; extras are skipped with a diagnostic.
    pub fn from_obj(path: impl AsRef<Path>) -> Result<Mesh> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|e| Error::MeshLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if models.len() > 1 {
            tracing::warn!(
                "{} contains {} models, using the first only",
                path.display(),
                models.len()
            );
        }

        let Some(model) = models.into_iter().next() else {
            return Err(Error::EmptyMesh);
        };

        let vertices = model
            .mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vertex::new(Vec3::new(p[0], p[1], p[2])))
            .collect();

        Ok(Mesh::new(vertices, model.mesh.indices))
    }
}
