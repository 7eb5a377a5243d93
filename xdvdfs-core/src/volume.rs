//! Locates and validates the XDVDFS volume descriptor.
//!
//! Grounded on the teacher crate's `read::read_volume` (single-location
//! magic check) and `blockdev::offset::OffsetWrapper::new` (retry across
//! a fixed list of candidate partition offsets) — this module fuses the
//! two: three candidate `(sector, volume_offset)` pairs are tried in a
//! fixed order, and the first one whose magic validates wins.

use crate::error::VolumeError;
use crate::sector::{SectorStream, SECTOR_SIZE_U64};
use std::io::{Read, Seek};

pub const VOLUME_HEADER_MAGIC: [u8; 0x14] = *b"MICROSOFT*XBOX*MEDIA";

/// Byte offset of the volume descriptor within its sector.
const VOLUME_DESCRIPTOR_SECTOR: u64 = 32;

/// Redump dual-layer discs place a video partition ahead of the game
/// partition; this is the byte offset of the game partition's sector 32
/// within such a dump.
const VOLUME_OFFSET_REDUMP_DUAL_LAYER: i64 = 0x5DA80000;

const MAGIC_TRAILER_OFFSET: u64 = 0x7EC;

/// The three candidate volume descriptor locations, tried in this order.
const CANDIDATES: [(u64, i64); 3] = [
    (VOLUME_DESCRIPTOR_SECTOR, 0),
    (VOLUME_DESCRIPTOR_SECTOR, VOLUME_OFFSET_REDUMP_DUAL_LAYER),
    (0, 0),
];

/// The fields of the volume descriptor the rest of the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Sector the descriptor itself (and its `0x7EC` trailer) occupies,
    /// relative to the committed volume offset. Usually 32, but the
    /// relocated/rebuilt layout places it at sector 0.
    pub header_sector: u32,
    pub root_dir_sector: u32,
    pub root_dir_size: u32,
}

/// Tries each of the three candidate locations in order; the first one
/// with valid magic at both the head and `0x7EC` commits the stream's
/// volume offset and returns its root directory location.
pub fn find_volume<R: Read + Seek>(
    stream: &mut SectorStream<R>,
) -> Result<VolumeInfo, VolumeError> {
    for &(sector, volume_offset) in &CANDIDATES {
        match validate_candidate(stream, sector, volume_offset) {
            Ok(info) => {
                stream.set_volume_offset(volume_offset);
                dbg_debug!(
                    "found xdvdfs volume at sector {sector}, volume_offset {volume_offset:#x}"
                );
                return Ok(info);
            }
            Err(VolumeError::NotFound) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(VolumeError::NotFound)
}

/// Checks a single candidate location without committing it to the
/// stream. Exposed so the Trimmer can validate a volume offset it has
/// already derived from a known Redump byte-length table, bypassing the
/// generic three-candidate search.
pub fn validate_candidate<R: Read + Seek>(
    stream: &mut SectorStream<R>,
    sector: u64,
    volume_offset: i64,
) -> Result<VolumeInfo, VolumeError> {
    let stream_len = stream.stream_len()?;

    let absolute = volume_offset + (sector * SECTOR_SIZE_U64) as i64;
    let Ok(absolute): Result<u64, _> = absolute.try_into() else {
        return Err(VolumeError::NotFound);
    };

    if absolute + SECTOR_SIZE_U64 > stream_len {
        return Err(VolumeError::NotFound);
    }

    let mut magic = [0u8; 0x14];
    if stream.read_raw_at(absolute, &mut magic)? != magic.len() || magic != VOLUME_HEADER_MAGIC {
        return Err(VolumeError::NotFound);
    }

    let mut field_buf = [0u8; 8];
    if stream.read_raw_at(absolute + 0x14, &mut field_buf)? != field_buf.len() {
        return Err(VolumeError::NotFound);
    }
    let root_dir_sector = u32::from_le_bytes(field_buf[0..4].try_into().unwrap());
    let root_dir_size = u32::from_le_bytes(field_buf[4..8].try_into().unwrap());

    let mut trailer = [0u8; 0x14];
    if stream.read_raw_at(absolute + MAGIC_TRAILER_OFFSET, &mut trailer)? != trailer.len()
        || trailer != VOLUME_HEADER_MAGIC
    {
        return Err(VolumeError::NotFound);
    }

    Ok(VolumeInfo {
        header_sector: sector as u32,
        root_dir_sector,
        root_dir_size,
    })
}
