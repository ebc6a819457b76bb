//! Error types for the anvilize library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for voxelization and region-file operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh file does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Mesh file exists but could not be parsed
    #[error("Failed to load mesh {path}: {reason}")]
    MeshLoad { path: PathBuf, reason: String },

    /// Mesh contains no triangles
    #[error("Mesh contains no triangles")]
    EmptyMesh,

    /// Mesh is taller than the supported build height
    #[error("Mesh is {voxels} voxels tall, above the {cap}-voxel build height")]
    OverHeightCap { voxels: u32, cap: u32 },

    /// Compressed chunk payload does not fit its region slot
    #[error("Chunk ({cx}, {cz}) needs {size} bytes, above the {limit}-byte sector slot")]
    ChunkOverflow {
        cx: u32,
        cz: u32,
        size: usize,
        limit: usize,
    },

    /// Invalid data structure in a region file
    #[error("Invalid region data: {0}")]
    InvalidRegion(String),

    /// Invalid data structure in an NBT document
    #[error("Invalid NBT document: {0}")]
    InvalidNbt(String),

    /// Write operation failed
    #[error("Cannot write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid-region error.
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    /// Create an invalid-NBT error.
    pub fn invalid_nbt(msg: impl Into<String>) -> Self {
        Self::InvalidNbt(msg.into())
    }

    /// Attach a path to a failed write.
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for anvilize operations.
pub type Result<T> = std::result::Result<T, Error>;
