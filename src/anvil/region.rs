//! Anvil region (`.mca`) assembly and parsing.
//!
//! A region file is 1026 sectors of 4096 bytes: sector 0 holds 1024 location
//! records, sector 1 holds 1024 timestamps, and chunk `i` owns the single
//! sector at byte `(i + 2) * 4096`. Chunk payloads are zlib-compressed NBT
//! prefixed with a `u32be` length and a compression-type byte.

use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use glam::UVec3;
use rayon::prelude::*;

use crate::util::{Error, Result};

use super::nbt::{NbtWriter, Tag};
use super::pack;

/// Chunks per region (32 x 32).
pub const REGION_CHUNKS: usize = 1024;
/// Region sector granularity.
pub const SECTOR_SIZE: usize = 4096;
/// Save-format revision written into every chunk (Minecraft 1.18.2).
pub const DATA_VERSION: i32 = 2975;

const HEADER_SECTORS: usize = 2;
const COMPRESSION_ZLIB: u8 = 2;
/// Lowest section index (yPos); 1.18 worlds start at y = -64.
const MIN_SECTION_Y: i32 = -4;

/// Write region file `r.<rx>.<rz>.mca` covering one tile occupancy grid.
///
/// `dims.y` must be a whole number of 16-voxel sections. All 1024 chunk
/// slots are populated; chunks beyond the grid extent come out as air. Chunk
/// buffers are built concurrently, each worker owning the disjoint location,
/// timestamp and payload slots of its chunk indices.
pub fn write_region(
    path: &Path,
    rx: i32,
    rz: i32,
    palette: &[String],
    grid: &[u32],
    dims: UVec3,
) -> Result<()> {
    assert!(!palette.is_empty());
    assert_eq!(dims.y % 16, 0, "tile height must be whole sections");

    let mut buffer = vec![0u8; (HEADER_SECTORS + REGION_CHUNKS) * SECTOR_SIZE];
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    let (locations, rest) = buffer.split_at_mut(SECTOR_SIZE);
    let (timestamps, payload) = rest.split_at_mut(SECTOR_SIZE);

    locations
        .par_chunks_mut(4)
        .zip(timestamps.par_chunks_mut(4))
        .zip(payload.par_chunks_mut(SECTOR_SIZE))
        .enumerate()
        .try_for_each(|(i, ((location, stamp), slot))| -> Result<()> {
            let (cx, cz) = ((i % 32) as u32, (i / 32) as u32);

            let chunk = encode_chunk(rx, rz, cx, cz, palette, grid, dims);
            let compressed = deflate(chunk.as_bytes())?;
            // Fixed one-sector spacing: an oversized payload would bleed
            // into the next chunk's slot, so refuse it instead.
            if 5 + compressed.len() > SECTOR_SIZE {
                return Err(Error::ChunkOverflow {
                    cx,
                    cz,
                    size: 5 + compressed.len(),
                    limit: SECTOR_SIZE,
                });
            }

            location.copy_from_slice(&((((i as u32) + 2) << 8) | 1).to_be_bytes());
            stamp.copy_from_slice(&timestamp.to_be_bytes());
            slot[..4].copy_from_slice(&(compressed.len() as u32 + 1).to_be_bytes());
            slot[4] = COMPRESSION_ZLIB;
            slot[5..5 + compressed.len()].copy_from_slice(&compressed);
            Ok(())
        })?;

    let mut file =
        std::fs::File::create(path).map_err(|e| Error::write_failed(path, e))?;
    file.write_all(&buffer)
        .map_err(|e| Error::write_failed(path, e))?;
    Ok(())
}

/// Build the NBT document for chunk `(cx, cz)` of region `(rx, rz)`.
fn encode_chunk(
    rx: i32,
    rz: i32,
    cx: u32,
    cz: u32,
    palette: &[String],
    grid: &[u32],
    dims: UVec3,
) -> NbtWriter {
    let section_count = dims.y / 16;
    let mut nbt = NbtWriter::with_capacity(64 * 1024);

    nbt.begin_compound("");
    nbt.int("DataVersion", DATA_VERSION);
    nbt.int("xPos", rx + cx as i32);
    nbt.int("zPos", rz + cz as i32);
    nbt.int("yPos", MIN_SECTION_Y);
    nbt.string("Status", "full");
    nbt.long("LastUpdate", 0);

    nbt.begin_list("sections", Tag::Compound, section_count);
    for sy in 0..section_count {
        nbt.begin_compound_value();
        nbt.byte("Y", (sy as i32 + MIN_SECTION_Y) as i8);

        nbt.begin_compound("biomes");
        nbt.begin_list("palette", Tag::String, 1);
        nbt.string_value("minecraft:the_void");
        nbt.end_compound();

        nbt.begin_compound("block_states");
        let entries = pack::section_entries(grid, dims, cx, cz, sy);
        if entries.iter().any(|&e| e != 0) {
            nbt.begin_list("palette", Tag::Compound, palette.len() as u32);
            for name in palette {
                nbt.begin_compound_value();
                nbt.string("Name", name);
                nbt.end_compound();
            }
            nbt.long_array("data", &pack::pack_section(&entries));
        } else {
            // All-air section: one-entry palette, no data array
            nbt.begin_list("palette", Tag::Compound, 1);
            nbt.begin_compound_value();
            nbt.string("Name", &palette[0]);
            nbt.end_compound();
        }
        nbt.end_compound();

        nbt.end_compound();
    }

    nbt.begin_list("block_entities", Tag::Compound, 0);
    nbt.begin_compound("Heightmaps");
    nbt.end_compound();
    nbt.begin_list("fluid_ticks", Tag::Compound, 0);
    nbt.begin_list("block_ticks", Tag::Compound, 0);
    nbt.begin_list("entities", Tag::Compound, 0);
    nbt.long("InhabitedTime", 0);

    nbt.begin_list("Lights", Tag::List, section_count);
    for _ in 0..section_count {
        nbt.empty_list_value();
    }
    nbt.begin_list("PostProcessing", Tag::List, section_count);
    for _ in 0..section_count {
        nbt.empty_list_value();
    }

    nbt.begin_compound("CarvingMasks");
    nbt.end_compound();
    nbt.begin_compound("structures");
    nbt.begin_compound("References");
    nbt.end_compound();
    nbt.begin_compound("starts");
    nbt.end_compound();
    nbt.end_compound();

    nbt.end_compound();
    nbt
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::invalid_region(format!("failed to inflate chunk: {e}")))?;
    Ok(out)
}

/// One populated chunk slot read back from a region file.
#[derive(Debug, Clone)]
pub struct RegionChunk {
    /// Linear chunk index; local position is `(index % 32, index / 32)`.
    pub index: usize,
    pub timestamp: u32,
    /// Decompressed chunk NBT.
    pub nbt: Vec<u8>,
}

/// Parse a region file, returning its populated chunk slots in index order.
pub fn read_region(path: &Path) -> Result<Vec<RegionChunk>> {
    let data = std::fs::read(path)?;
    if data.len() < HEADER_SECTORS * SECTOR_SIZE {
        return Err(Error::invalid_region("truncated region header"));
    }

    let mut chunks = Vec::new();
    for i in 0..REGION_CHUNKS {
        let location = (&data[i * 4..]).read_u32::<BigEndian>()?;
        if location == 0 {
            continue;
        }
        let offset = (location >> 8) as usize * SECTOR_SIZE;
        let timestamp = (&data[SECTOR_SIZE + i * 4..]).read_u32::<BigEndian>()?;

        if offset + 5 > data.len() {
            return Err(Error::invalid_region(format!(
                "chunk {i} offset {offset} out of bounds"
            )));
        }
        let length = (&data[offset..]).read_u32::<BigEndian>()? as usize;
        if length == 0 || offset + 4 + length > data.len() {
            return Err(Error::invalid_region(format!(
                "chunk {i} length {length} out of bounds"
            )));
        }
        let compression = data[offset + 4];
        if compression != COMPRESSION_ZLIB {
            return Err(Error::invalid_region(format!(
                "chunk {i} has unsupported compression type {compression}"
            )));
        }

        let nbt = inflate(&data[offset + 5..offset + 4 + length])?;
        chunks.push(RegionChunk {
            index: i,
            timestamp,
            nbt,
        });
    }
    Ok(chunks)
}
