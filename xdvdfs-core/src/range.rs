//! Builds the Valid Sector Set from a walk and merges it into a sorted,
//! disjoint list of inclusive sector ranges.
//!
//! The header sectors (volume descriptor + its neighbor) are seeded
//! directly from `VolumeInfo::header_sector` rather than recomputed from
//! `volume_offset + 0x10000`: every read in this crate already goes
//! through [`crate::sector::SectorStream`], which bakes the volume
//! offset into its addressing, so `header_sector` here always means the
//! same relative sector the teacher crate's `OffsetWrapper` would call
//! sector 32 (or 0, for the relocated layout) after applying its own
//! partition offset.

use crate::cancel::CancelFlag;
use crate::sector::{sectors_for_bytes, SectorStream};
use crate::volume::VolumeInfo;
use crate::walk::{self, SystemUpdateFilter, WalkItem};
use std::collections::BTreeSet;
use std::io;
use std::io::{Read, Seek};

/// Disjoint, ascending, inclusive `(start, end)` sector ranges.
pub type RangeList = Vec<(u32, u32)>;

pub struct RangeResult {
    pub ranges: RangeList,
    pub cancelled: bool,
}

/// Walks the volume's root directory tree and reduces every referenced
/// sector into merged ranges.
pub fn collect_ranges<R: Read + Seek>(
    stream: &mut SectorStream<R>,
    volume: VolumeInfo,
    filter: SystemUpdateFilter,
    cancel: &CancelFlag,
) -> Result<RangeResult, io::Error> {
    let mut valid: BTreeSet<u32> = BTreeSet::new();
    valid.insert(volume.header_sector);
    valid.insert(volume.header_sector + 1);

    let walked = walk::walk(
        stream,
        volume.root_dir_sector,
        volume.root_dir_size,
        filter,
        cancel,
    )?;

    for item in &walked.items {
        match item {
            WalkItem::TableHeader {
                start_sector,
                sector_count,
            } => {
                for s in *start_sector..start_sector.saturating_add(*sector_count) {
                    valid.insert(s);
                }
            }
            WalkItem::Entry(entry) => {
                if !entry.attributes.directory() && entry.start_sector != 0 {
                    let count = sectors_for_bytes(entry.file_size);
                    for s in entry.start_sector..entry.start_sector.saturating_add(count) {
                        valid.insert(s);
                    }
                }
            }
        }
    }

    Ok(RangeResult {
        ranges: merge(valid),
        cancelled: walked.cancelled,
    })
}

fn merge(sectors: BTreeSet<u32>) -> RangeList {
    let mut ranges: RangeList = Vec::new();
    for s in sectors {
        match ranges.last_mut() {
            Some((_, end)) if s == *end + 1 => *end = s,
            _ => ranges.push((s, s)),
        }
    }
    ranges
}
