//! Iterative, cycle-safe traversal of the on-disc directory binary tree.
//!
//! Grounded on the teacher crate's `read::dirent_table::walk_dirent_tree`
//! (explicit `Vec` stack, right child pushed before left so left pops
//! first) but extended with the visited-position set this spec calls
//! for: the teacher's version is a pure in-memory ISO builder input and
//! trusts the source; this one assumes the source may be corrupt or
//! adversarial.

use crate::cancel::CancelFlag;
use crate::dirent::{self, DirentEntry, DirentError, DirentRead};
use crate::sector::{sectors_for_bytes, SectorStream, SECTOR_SIZE_U64};
use std::collections::HashSet;
use std::io;
use std::io::{Read, Seek};

/// How `$SystemUpdate` subtrees are treated during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemUpdateFilter {
    /// Walk everything.
    Disabled,
    /// Skip a subtree named exactly `$SystemUpdate` (case-insensitive).
    Exact,
    /// Skip a subtree whose name begins with `$SystemUpdate`
    /// (case-insensitive) — the source project's looser rebuild variant.
    Prefix,
}

impl SystemUpdateFilter {
    fn matches(&self, name: &str) -> bool {
        let upper = name.to_ascii_uppercase();
        match self {
            SystemUpdateFilter::Disabled => false,
            SystemUpdateFilter::Exact => upper == "$SYSTEMUPDATE",
            SystemUpdateFilter::Prefix => upper.starts_with("$SYSTEMUPDATE"),
        }
    }
}

/// One observation emitted by a walk: either the header sectors backing
/// a directory table, or a decoded entry within one.
#[derive(Debug)]
pub enum WalkItem {
    TableHeader { start_sector: u32, sector_count: u32 },
    Entry(DirentEntry),
}

pub struct WalkResult {
    pub items: Vec<WalkItem>,
    pub cancelled: bool,
}

struct WorkItem {
    sector: u32,
    size: u32,
    intra_offset: u32,
}

/// Walks the directory table at `(root_sector, root_size)`, following
/// subdirectories recursively. Corrupt entries are dropped and the walk
/// continues with their siblings; only a genuine I/O failure aborts it.
pub fn walk<R: Read + Seek>(
    stream: &mut SectorStream<R>,
    root_sector: u32,
    root_size: u32,
    filter: SystemUpdateFilter,
    cancel: &CancelFlag,
) -> Result<WalkResult, io::Error> {
    let mut stack = vec![WorkItem {
        sector: root_sector,
        size: root_size,
        intra_offset: 0,
    }];
    let mut visited: HashSet<u64> = HashSet::new();
    let mut items = Vec::new();

    while let Some(work) = stack.pop() {
        if cancel.is_cancelled() {
            return Ok(WalkResult {
                items,
                cancelled: true,
            });
        }

        if work.intra_offset >= work.size {
            continue;
        }

        let position = work.sector as u64 * SECTOR_SIZE_U64 + work.intra_offset as u64;
        if !visited.insert(position) {
            continue;
        }

        if work.intra_offset == 0 {
            items.push(WalkItem::TableHeader {
                start_sector: work.sector,
                sector_count: sectors_for_bytes(work.size),
            });
        }

        match dirent::decode(stream, work.sector, work.size, work.intra_offset) {
            Ok(DirentRead::EmptyTable) => continue,
            Ok(DirentRead::Entry(entry)) => {
                if entry.right != 0xFFFF && entry.right != 0 {
                    stack.push(WorkItem {
                        sector: work.sector,
                        size: work.size,
                        intra_offset: entry.right_child_intra_offset(),
                    });
                }

                let is_directory = entry.attributes.directory();
                let skip_subtree = is_directory && filter.matches(&entry.name);
                if is_directory && entry.start_sector != 0 && !skip_subtree {
                    stack.push(WorkItem {
                        sector: entry.start_sector,
                        size: entry.file_size,
                        intra_offset: 0,
                    });
                }

                if entry.left != 0xFFFF
                    && entry.left != 0
                    && entry.left_child_intra_offset() != work.intra_offset
                {
                    stack.push(WorkItem {
                        sector: work.sector,
                        size: work.size,
                        intra_offset: entry.left_child_intra_offset(),
                    });
                }

                items.push(WalkItem::Entry(entry));
            }
            Err(DirentError::Io(e)) => return Err(e),
            Err(DirentError::Corrupt(reason)) => {
                dbg_debug!(
                    "dropping corrupt entry at sector {} offset {}: {reason}",
                    work.sector,
                    work.intra_offset
                );
                continue;
            }
        }
    }

    Ok(WalkResult {
        items,
        cancelled: false,
    })
}
