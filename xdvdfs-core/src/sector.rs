//! A random-access view over a source image as a sequence of fixed-size
//! sectors, with a volume offset that relocates every subsequent sector
//! address.
//!
//! Grounded on the teacher crate's blanket `BlockDeviceRead` impl for any
//! `Read + Seek` (`xdvdfs-core::blockdev::read`): rather than a trait
//! object, this crate is small enough that a single generic struct
//! suffices, and a `Box<dyn Read + Seek>` caller can still monomorphize
//! over it trivially.

use std::io::{self, Read, Seek, SeekFrom};

pub const SECTOR_SIZE: u32 = 2048;
pub const SECTOR_SIZE_U64: u64 = SECTOR_SIZE as u64;
pub const SECTOR_SIZE_USZ: usize = SECTOR_SIZE as usize;

/// Rounds a byte count up to a whole number of sectors. `bytes` comes
/// from on-disc entries the walker has to tolerate being corrupt or
/// adversarial, so this widens to `u64` rather than risking overflow on
/// `bytes` values near `u32::MAX`.
pub fn sectors_for_bytes(bytes: u32) -> u32 {
    (bytes as u64).div_ceil(SECTOR_SIZE_U64) as u32
}

/// Wraps an open, read-only random-access handle to the source image.
///
/// Owns the handle exclusively: every other component in this crate
/// borrows a `&mut SectorStream`.
pub struct SectorStream<R> {
    inner: R,
    volume_offset: i64,
}

impl<R: Read + Seek> SectorStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            volume_offset: 0,
        }
    }

    pub fn volume_offset(&self) -> i64 {
        self.volume_offset
    }

    /// Commits the base offset used by [`Self::read_at`] and
    /// [`Self::read_file_bytes`]. Called exactly once, by
    /// [`crate::volume::find_volume`], after a candidate location
    /// validates.
    pub fn set_volume_offset(&mut self, offset: i64) {
        self.volume_offset = offset;
    }

    /// Total length of the underlying stream, independent of the volume
    /// offset.
    pub fn stream_len(&mut self) -> io::Result<u64> {
        self.inner.seek(SeekFrom::End(0))
    }

    /// Positioned read at an absolute byte offset in the underlying
    /// stream, ignoring the volume offset. Used only while probing
    /// candidate volume descriptor locations, before a volume offset has
    /// been committed.
    pub fn read_raw_at(&mut self, absolute: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.seek(SeekFrom::Start(absolute))?;
        read_short(&mut self.inner, buf)
    }

    /// Positioned read relative to the volume offset: the effective
    /// absolute position is `volume_offset + position`.
    ///
    /// Returns the number of bytes actually read; a read that runs past
    /// end-of-stream is reported as a short read, not an error.
    pub fn read_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let absolute = self.volume_offset + position as i64;
        let absolute: u64 = absolute
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "negative stream position"))?;
        self.read_raw_at(absolute, buf)
    }

    /// Reads up to `buf.len()` bytes of file content at `logical_offset`
    /// within a file whose data begins at `start_sector`. Returns 0 if
    /// `logical_offset` is already at or beyond end-of-stream.
    pub fn read_file_bytes(
        &mut self,
        start_sector: u32,
        logical_offset: u64,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        let position = start_sector as u64 * SECTOR_SIZE_U64 + logical_offset;
        let absolute = self.volume_offset + position as i64;
        let absolute: u64 = match absolute.try_into() {
            Ok(a) => a,
            Err(_) => return Ok(0),
        };

        let len = self.stream_len()?;
        if absolute >= len {
            return Ok(0);
        }

        self.read_raw_at(absolute, buf)
    }
}

/// `Read::read` on most std types already returns a short count instead
/// of erroring at EOF; this just makes that contract explicit and
/// resilient to readers that return `Ok(0)` before filling the buffer on
/// a slow/chunked source.
fn read_short<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
