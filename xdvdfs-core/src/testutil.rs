//! Synthetic XDVDFS image construction for tests.
//!
//! There is no real Xbox disc in this repository, so every test that
//! needs a tree builds one by hand: [`RawEntry`] describes one
//! filesystem entry, [`chain_table`] lays a list of them out as a
//! right-linked chain (a degenerate but perfectly legal binary tree —
//! `left` stays `0`, meaning "no left child" under the iterative
//! walker's rules), and [`ImageBuilder`] drops the resulting bytes at
//! chosen sectors of an otherwise all-zero backing file.

use crate::dirent::{DirentAttributes, DirentEntry};
use crate::sector::SECTOR_SIZE_USZ;
use crate::volume::VOLUME_HEADER_MAGIC;

/// A convenience description of one entry, before it's been placed in a
/// table and assigned real left/right links.
pub struct RawEntry {
    pub name: String,
    pub is_directory: bool,
    pub start_sector: u32,
    pub size: u32,
}

impl RawEntry {
    pub fn file(name: &str, start_sector: u32, file_size: u32) -> Self {
        Self {
            name: name.to_string(),
            is_directory: false,
            start_sector,
            size: file_size,
        }
    }

    pub fn dir(name: &str, start_sector: u32, table_size: u32) -> Self {
        Self {
            name: name.to_string(),
            is_directory: true,
            start_sector,
            size: table_size,
        }
    }

    /// A standalone entry with no siblings: `left = 0` (no left child),
    /// `right = 0xFFFF` (no right child).
    pub fn to_dirent(&self) -> DirentEntry {
        let mut attrs = DirentAttributes(0);
        attrs.set_directory(self.is_directory);
        DirentEntry {
            left: 0,
            right: 0xFFFF,
            start_sector: self.start_sector,
            file_size: self.size,
            attributes: attrs,
            name: self.name.clone(),
            entry_sector: 0,
            entry_offset: 0,
        }
    }
}

/// Lays `entries` out as a right-linked chain within one directory
/// table. Returns the raw bytes, the table's logical (unpadded) byte
/// size, and each entry's intra-table offset in input order.
pub fn chain_table(entries: &[RawEntry]) -> (Vec<u8>, u32, Vec<u32>) {
    if entries.is_empty() {
        // The empty-table sentinel only needs its first two bytes read.
        return (vec![0xFF, 0xFF], 2, vec![]);
    }

    let mut dirents: Vec<DirentEntry> = entries.iter().map(RawEntry::to_dirent).collect();
    let lengths: Vec<usize> = dirents.iter().map(|e| e.encode().len()).collect();

    let mut offsets = Vec::with_capacity(dirents.len());
    let mut cursor = 0u32;
    for &len in &lengths {
        offsets.push(cursor);
        cursor += len as u32;
    }

    for i in 0..dirents.len() {
        dirents[i].left = 0;
        dirents[i].right = if i + 1 < dirents.len() {
            let word_offset = offsets[i + 1] / 4;
            assert!(
                word_offset <= u16::MAX as u32,
                "chain_table: entry {i} right-child offset {word_offset} overflows u16 \
                 (table has too many/too-large entries for a right-linked chain)"
            );
            word_offset as u16
        } else {
            0xFFFF
        };
    }

    let mut buf = Vec::new();
    for e in &dirents {
        buf.extend_from_slice(&e.encode());
    }
    let table_size = buf.len() as u32;

    (buf, table_size, offsets)
}

/// Accumulates raw bytes at chosen sectors and assembles them into one
/// zero-padded backing buffer.
pub struct ImageBuilder {
    blobs: Vec<(u32, Vec<u8>)>,
    min_sectors: u32,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            blobs: Vec::new(),
            // Leaves room for a sector-32 volume descriptor even if the
            // test only ever touches a directory table elsewhere.
            min_sectors: 34,
        }
    }

    pub fn put_raw(mut self, sector: u32, bytes: &[u8]) -> Self {
        let end_sector = sector + bytes.len().div_ceil(SECTOR_SIZE_USZ).max(1) as u32;
        self.min_sectors = self.min_sectors.max(end_sector);
        self.blobs.push((sector, bytes.to_vec()));
        self
    }

    fn write_descriptor(self, base_sector: u32, root_dir_sector: u32, root_dir_size: u32) -> Self {
        let mut sector_buf = vec![0u8; SECTOR_SIZE_USZ];
        sector_buf[0..0x14].copy_from_slice(&VOLUME_HEADER_MAGIC);
        sector_buf[0x14..0x18].copy_from_slice(&root_dir_sector.to_le_bytes());
        sector_buf[0x18..0x1C].copy_from_slice(&root_dir_size.to_le_bytes());
        sector_buf[0x7EC..0x7EC + 0x14].copy_from_slice(&VOLUME_HEADER_MAGIC);
        self.put_raw(base_sector, &sector_buf)
    }

    /// Standard layout: descriptor at sector 32, volume offset 0.
    pub fn with_root(self, root_dir_sector: u32, root_dir_size: u32) -> Self {
        self.write_descriptor(32, root_dir_sector, root_dir_size)
    }

    /// Rebuilt/trimmed layout: descriptor relocated to sector 0.
    pub fn with_root_at_sector_zero(self, root_dir_sector: u32, root_dir_size: u32) -> Self {
        self.write_descriptor(0, root_dir_sector, root_dir_size)
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; self.min_sectors as usize * SECTOR_SIZE_USZ];
        for (sector, bytes) in self.blobs {
            let start = sector as usize * SECTOR_SIZE_USZ;
            out[start..start + bytes.len()].copy_from_slice(&bytes);
        }
        out
    }
}
