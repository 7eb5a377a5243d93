//! Integrity Verifier: a full tree traversal, optionally followed by a
//! sequential, chunked read of every file's content.
//!
//! Grounded on the teacher crate's `read::disk_data::read_data_all`
//! (sequential positioned reads through to end-of-file) but restructured
//! as a standalone pass over an already-completed [`crate::walk::walk`]
//! result, since this crate's walker already materializes the whole
//! entry list rather than visiting lazily.
//!
//! The tree walk alone already catches a corrupt or truncated directory
//! structure; `surface_scan` additionally reads every file's content
//! back to catch corruption the tree itself can't reveal. The Trimmer's
//! own post-write check runs with `surface_scan` off, since it already
//! trusts the bytes it just copied and only needs to confirm the output
//! is still a walkable filesystem.

use crate::cancel::CancelFlag;
use crate::error::VerifyError;
use crate::progress::{NoOpProgressSink, ProgressEvent, ProgressSink};
use crate::sector::SectorStream;
use crate::volume;
use crate::walk::{self, SystemUpdateFilter, WalkItem};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

const VERIFY_CHUNK_SIZE: usize = 4 * 1024 * 1024;
const PROGRESS_INTERVAL_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Passed,
    Failed { file: String, reason: String },
}

/// Opens `path`, locates its volume descriptor, and walks its directory
/// tree. When `surface_scan` is true, also sequentially reads every
/// file's content and stops at the first failing file. Reports no
/// progress; use [`verify_image_with_progress`] to drive a sink.
pub fn verify_image<P: AsRef<Path>>(
    path: P,
    filter: SystemUpdateFilter,
    surface_scan: bool,
    cancel: &CancelFlag,
) -> Result<VerifyOutcome, VerifyError> {
    verify_image_with_progress(path, filter, surface_scan, cancel, &mut NoOpProgressSink)
}

/// As [`verify_image`], but reports [`ProgressEvent`]s to `progress` as
/// file content is read back, the same way [`crate::trim::trim_image`]
/// reports its copy progress. Emits no events at all when `surface_scan`
/// is false, since there is then no byte-level work to report.
pub fn verify_image_with_progress<P: AsRef<Path>>(
    path: P,
    filter: SystemUpdateFilter,
    surface_scan: bool,
    cancel: &CancelFlag,
    progress: &mut dyn ProgressSink,
) -> Result<VerifyOutcome, VerifyError> {
    let file = File::open(path)?;
    let mut stream = SectorStream::new(file);
    verify_stream(&mut stream, filter, surface_scan, cancel, progress)
}

pub fn verify_stream<R: Read + Seek>(
    stream: &mut SectorStream<R>,
    filter: SystemUpdateFilter,
    surface_scan: bool,
    cancel: &CancelFlag,
    progress: &mut dyn ProgressSink,
) -> Result<VerifyOutcome, VerifyError> {
    let info = volume::find_volume(stream)?;

    let walked = walk::walk(stream, info.root_dir_sector, info.root_dir_size, filter, cancel)?;
    if walked.cancelled {
        return Err(VerifyError::Cancelled);
    }

    if !surface_scan {
        return Ok(VerifyOutcome::Passed);
    }

    let total_bytes: u64 = walked
        .items
        .iter()
        .filter_map(|item| match item {
            WalkItem::Entry(e) if !e.attributes.directory() => Some(e.file_size as u64),
            _ => None,
        })
        .sum();

    let mut chunk = vec![0u8; VERIFY_CHUNK_SIZE];
    let mut bytes_done: u64 = 0;
    let mut last_progress_at: u64 = 0;

    for item in &walked.items {
        let WalkItem::Entry(entry) = item else {
            continue;
        };
        if entry.attributes.directory() {
            continue;
        }
        if entry.file_size == 0 {
            continue;
        }
        if entry.start_sector == 0 {
            return Ok(VerifyOutcome::Failed {
                file: entry.name.clone(),
                reason: "nonzero size with no data sector".to_string(),
            });
        }

        let mut remaining = entry.file_size as u64;
        let mut logical_offset = 0u64;
        while remaining > 0 {
            if cancel.is_cancelled() {
                return Err(VerifyError::Cancelled);
            }

            let want = remaining.min(chunk.len() as u64) as usize;
            let n = stream.read_file_bytes(entry.start_sector, logical_offset, &mut chunk[..want])?;
            if n < want {
                return Ok(VerifyOutcome::Failed {
                    file: entry.name.clone(),
                    reason: format!(
                        "short read at offset {logical_offset}: expected {want} bytes, got {n}"
                    ),
                });
            }

            remaining -= want as u64;
            logical_offset += want as u64;
            bytes_done += want as u64;

            if bytes_done - last_progress_at >= PROGRESS_INTERVAL_BYTES {
                last_progress_at = bytes_done;
                progress.report(ProgressEvent {
                    status_text: "verifying",
                    bytes_processed: bytes_done,
                    total_bytes,
                });
            }
        }
    }

    Ok(VerifyOutcome::Passed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{chain_table, ImageBuilder, RawEntry};
    use std::io::Cursor;

    fn build_single_file_image(file_size: u32, content: &[u8]) -> Vec<u8> {
        let entries = vec![RawEntry::file("default.xbe", 34, file_size)];
        let (table_bytes, table_size, _) = chain_table(&entries);

        let mut builder = ImageBuilder::new()
            .with_root(33, table_size)
            .put_raw(33, &table_bytes);
        if !content.is_empty() {
            builder = builder.put_raw(34, content);
        }
        builder.build()
    }

    #[test]
    fn passes_on_intact_file() {
        let content = vec![0xAB; 10];
        let img = build_single_file_image(10, &content);
        let mut stream = SectorStream::new(Cursor::new(img));

        let outcome = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            true,
            &CancelFlag::new(),
            &mut NoOpProgressSink,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Passed);
    }

    #[test]
    fn zero_size_file_passes_trivially() {
        let entries = vec![RawEntry::file("empty.txt", 0, 0)];
        let (table_bytes, table_size, _) = chain_table(&entries);
        let img = ImageBuilder::new()
            .with_root(33, table_size)
            .put_raw(33, &table_bytes)
            .build();
        let mut stream = SectorStream::new(Cursor::new(img));

        let outcome = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            true,
            &CancelFlag::new(),
            &mut NoOpProgressSink,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Passed);
    }

    #[test]
    fn truncated_file_content_fails_under_surface_scan() {
        // Declare a file far larger than the backing image actually holds.
        let img = build_single_file_image(16 * 1024 * 1024, &[]);
        let mut stream = SectorStream::new(Cursor::new(img));

        let outcome = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            true,
            &CancelFlag::new(),
            &mut NoOpProgressSink,
        )
        .unwrap();
        match outcome {
            VerifyOutcome::Failed { file, .. } => assert_eq!(file, "default.xbe"),
            VerifyOutcome::Passed => panic!("expected a failure"),
        }
    }

    #[test]
    fn truncated_file_content_passes_without_surface_scan() {
        // Same malformed image as above, but the tree itself is intact,
        // so a structural-only pass has nothing to complain about.
        let img = build_single_file_image(16 * 1024 * 1024, &[]);
        let mut stream = SectorStream::new(Cursor::new(img));

        let outcome = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            false,
            &CancelFlag::new(),
            &mut NoOpProgressSink,
        )
        .unwrap();
        assert_eq!(outcome, VerifyOutcome::Passed);
    }

    #[test]
    fn cancellation_is_reported_as_cancelled() {
        let content = vec![0u8; 10];
        let img = build_single_file_image(10, &content);
        let mut stream = SectorStream::new(Cursor::new(img));

        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            true,
            &cancel,
            &mut NoOpProgressSink,
        );
        assert!(matches!(result, Err(VerifyError::Cancelled)));
    }

    #[test]
    fn progress_is_reported_past_the_interval_threshold() {
        let size = PROGRESS_INTERVAL_BYTES as u32 + 4096;
        let content = vec![0u8; size as usize];
        let img = build_single_file_image(size, &content);
        let mut stream = SectorStream::new(Cursor::new(img));

        let mut events: Vec<ProgressEvent> = Vec::new();
        let outcome = verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            true,
            &CancelFlag::new(),
            &mut |event: ProgressEvent| events.push(event),
        )
        .unwrap();

        assert_eq!(outcome, VerifyOutcome::Passed);
        assert!(!events.is_empty());
        assert_eq!(events[0].status_text, "verifying");
        assert_eq!(events[0].total_bytes, size as u64);
    }

    #[test]
    fn no_surface_scan_emits_no_progress() {
        let size = PROGRESS_INTERVAL_BYTES as u32 + 4096;
        let content = vec![0u8; size as usize];
        let img = build_single_file_image(size, &content);
        let mut stream = SectorStream::new(Cursor::new(img));

        let mut events: Vec<ProgressEvent> = Vec::new();
        verify_stream(
            &mut stream,
            SystemUpdateFilter::Disabled,
            false,
            &CancelFlag::new(),
            &mut |event: ProgressEvent| events.push(event),
        )
        .unwrap();

        assert!(events.is_empty());
    }
}
