use glam::UVec3;
use tempfile::NamedTempFile;

use super::nbt::{self, Tag, Value};
use super::pack;
use super::*;

fn default_palette() -> Vec<String> {
    vec!["minecraft:air".to_string(), "minecraft:stone".to_string()]
}

/// 16x16x16 grid with voxel (0, 0, 0) set.
fn one_voxel_grid() -> (Vec<u32>, UVec3) {
    let dims = UVec3::new(16, 16, 16);
    let mut grid = vec![0u32; 4096];
    grid[0] = 1;
    (grid, dims)
}

#[test]
fn test_write_and_read_region() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();

    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;

    let file_len = std::fs::metadata(temp.path())?.len();
    assert_eq!(file_len as usize, (2 + REGION_CHUNKS) * SECTOR_SIZE);

    let chunks = read_region(temp.path())?;
    assert_eq!(chunks.len(), REGION_CHUNKS);

    let (name, root) = nbt::decode(&chunks[0].nbt)?;
    assert_eq!(name, "");
    assert_eq!(root.get("DataVersion").unwrap().as_int(), Some(DATA_VERSION));
    assert_eq!(root.get("xPos").unwrap().as_int(), Some(0));
    assert_eq!(root.get("zPos").unwrap().as_int(), Some(0));
    assert_eq!(root.get("yPos").unwrap().as_int(), Some(-4));
    assert_eq!(root.get("Status").unwrap().as_str(), Some("full"));

    let sections = root.get("sections").unwrap().as_list().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].get("Y"), Some(&Value::Byte(-4)));
    Ok(())
}

#[test]
fn test_occupied_section_has_palette_and_data() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();
    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;

    let chunks = read_region(temp.path())?;
    let (_, root) = nbt::decode(&chunks[0].nbt)?;
    let section = &root.get("sections").unwrap().as_list().unwrap()[0];
    let block_states = section.get("block_states").unwrap();

    let palette = block_states.get("palette").unwrap().as_list().unwrap();
    assert_eq!(palette.len(), 2);
    assert_eq!(palette[0].get("Name").unwrap().as_str(), Some("minecraft:air"));
    assert_eq!(
        palette[1].get("Name").unwrap().as_str(),
        Some("minecraft:stone")
    );

    let Some(Value::LongArray(words)) = block_states.get("data") else {
        panic!("occupied section must carry a data array");
    };
    assert_eq!(words.len(), pack::WORDS_PER_SECTION);
    let entries = pack::unpack_section(words);
    assert_eq!(entries[0], 1);
    assert_eq!(entries.iter().sum::<u32>(), 1);
    Ok(())
}

#[test]
fn test_air_section_elides_data() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();
    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;

    let chunks = read_region(temp.path())?;
    // Chunk (1, 0) is outside the 16-voxel grid, hence all air
    let (_, root) = nbt::decode(&chunks[1].nbt)?;
    let section = &root.get("sections").unwrap().as_list().unwrap()[0];
    let block_states = section.get("block_states").unwrap();

    let palette = block_states.get("palette").unwrap().as_list().unwrap();
    assert_eq!(palette.len(), 1);
    assert_eq!(palette[0].get("Name").unwrap().as_str(), Some("minecraft:air"));
    assert!(block_states.get("data").is_none());
    Ok(())
}

#[test]
fn test_biomes_and_bookkeeping_tags() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();
    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;

    let chunks = read_region(temp.path())?;
    let (_, root) = nbt::decode(&chunks[0].nbt)?;

    let section = &root.get("sections").unwrap().as_list().unwrap()[0];
    let biomes = section.get("biomes").unwrap();
    assert_eq!(
        biomes.get("palette"),
        Some(&Value::List(
            Tag::String,
            vec![Value::String("minecraft:the_void".to_string())]
        ))
    );

    assert_eq!(root.get("LastUpdate"), Some(&Value::Long(0)));
    assert_eq!(root.get("InhabitedTime"), Some(&Value::Long(0)));
    assert_eq!(root.get("block_entities"), Some(&Value::List(Tag::Compound, vec![])));
    let lights = root.get("Lights").unwrap().as_list().unwrap();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0], Value::List(Tag::End, vec![]));
    let structures = root.get("structures").unwrap();
    assert!(structures.get("References").is_some());
    assert!(structures.get("starts").is_some());
    Ok(())
}

#[test]
fn test_header_layout() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();
    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;

    let data = std::fs::read(temp.path())?;
    for i in 0..REGION_CHUNKS {
        let record = u32::from_be_bytes(data[i * 4..i * 4 + 4].try_into().unwrap());
        assert_eq!(record >> 8, i as u32 + 2, "chunk {i} sector offset");
        assert_eq!(record & 0xFF, 1, "chunk {i} sector count");

        // Payload framing at the located sector
        let offset = (record >> 8) as usize * SECTOR_SIZE;
        let length =
            u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
        assert!(length > 1);
        assert!(5 + length - 1 <= SECTOR_SIZE);
        assert_eq!(data[offset + 4], 2, "zlib compression type");
    }
    Ok(())
}

#[test]
fn test_chunk_positions_follow_region_coordinates() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();
    write_region(temp.path(), 3, 5, &default_palette(), &grid, dims)?;

    let chunks = read_region(temp.path())?;
    let i = 33; // local (1, 1)
    let (_, root) = nbt::decode(&chunks[i].nbt)?;
    assert_eq!(root.get("xPos").unwrap().as_int(), Some(4));
    assert_eq!(root.get("zPos").unwrap().as_int(), Some(6));
    Ok(())
}

#[test]
fn test_deterministic_outside_timestamps() -> crate::util::Result<()> {
    let temp_a = NamedTempFile::new()?;
    let temp_b = NamedTempFile::new()?;
    let (grid, dims) = one_voxel_grid();

    write_region(temp_a.path(), 0, 0, &default_palette(), &grid, dims)?;
    write_region(temp_b.path(), 0, 0, &default_palette(), &grid, dims)?;

    let a = std::fs::read(temp_a.path())?;
    let b = std::fs::read(temp_b.path())?;
    assert_eq!(a.len(), b.len());
    // Sector 1 holds wall-clock timestamps; everything else must match
    assert_eq!(a[..SECTOR_SIZE], b[..SECTOR_SIZE]);
    assert_eq!(a[2 * SECTOR_SIZE..], b[2 * SECTOR_SIZE..]);

    // Timestamps are uniform within a file and by-position comparable
    let stamp = |data: &[u8], i: usize| {
        u32::from_be_bytes(
            data[SECTOR_SIZE + i * 4..SECTOR_SIZE + i * 4 + 4]
                .try_into()
                .unwrap(),
        )
    };
    let first = stamp(&a, 0);
    assert!(first > 0);
    assert!((0..REGION_CHUNKS).all(|i| stamp(&a, i) == first));
    Ok(())
}

#[test]
fn test_taller_grid_produces_more_sections() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let dims = UVec3::new(16, 64, 16);
    let mut grid = vec![0u32; (dims.x * dims.y * dims.z) as usize];
    // Occupy one voxel in section 2 (y = 40)
    grid[(40 * dims.x) as usize] = 1;

    write_region(temp.path(), 0, 0, &default_palette(), &grid, dims)?;
    let chunks = read_region(temp.path())?;
    let (_, root) = nbt::decode(&chunks[0].nbt)?;
    let sections = root.get("sections").unwrap().as_list().unwrap();
    assert_eq!(sections.len(), 4);

    for (sy, section) in sections.iter().enumerate() {
        assert_eq!(section.get("Y"), Some(&Value::Byte(sy as i8 - 4)));
        let has_data = section.get("block_states").unwrap().get("data").is_some();
        assert_eq!(has_data, sy == 2, "only section 2 is occupied");
    }
    Ok(())
}

#[test]
fn test_write_failure_carries_path() {
    let (grid, dims) = one_voxel_grid();
    let path = std::path::Path::new("/nonexistent-dir/r.0.0.mca");
    let err = write_region(path, 0, 0, &default_palette(), &grid, dims).unwrap_err();
    match err {
        crate::util::Error::WriteFailed { path: p, .. } => {
            assert!(p.ends_with("r.0.0.mca"));
        }
        other => panic!("expected WriteFailed, got {other:?}"),
    }
}
