//! Error taxonomy shared by the volume reader, walker, trimmer, and
//! verifier.
//!
//! Format errors are the ones a corrupted or foreign disc image can
//! trigger; I/O errors come from the underlying stream and are wrapped
//! rather than re-derived so the original [`std::io::Error`] survives.

use std::io;

/// Errors describing a malformed XDVDFS structure, as opposed to a
/// failure of the underlying storage.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// Neither of the three candidate volume descriptor locations validated.
    #[error("not a valid XDVDFS volume")]
    InvalidVolume,

    /// A directory entry could not be decoded: a short read, or a name
    /// length that would run past the end of its directory table.
    #[error("corrupt directory entry: {0}")]
    CorruptEntry(&'static str),

    /// The range engine produced only the header range; there is no
    /// filesystem to trim.
    #[error("no filesystem found on volume")]
    NoFilesystem,

    /// A gap between two valid ranges was not a whole number of sectors.
    #[error("gap between valid ranges is not sector-aligned")]
    MisalignedFiller,
}

/// Errors from locating the volume descriptor, kept separate from
/// [`FormatError`] so a genuine I/O failure during the candidate search
/// doesn't get reported to the caller as "not a valid XDVDFS volume".
#[derive(thiserror::Error, Debug)]
pub enum VolumeError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("not a valid XDVDFS volume")]
    NotFound,
}

impl From<VolumeError> for TrimError {
    fn from(e: VolumeError) -> Self {
        match e {
            VolumeError::Io(io) => TrimError::Io(io),
            VolumeError::NotFound => TrimError::Format(FormatError::InvalidVolume),
        }
    }
}

impl From<VolumeError> for VerifyError {
    fn from(e: VolumeError) -> Self {
        match e {
            VolumeError::Io(io) => VerifyError::Io(io),
            VolumeError::NotFound => VerifyError::Format(FormatError::InvalidVolume),
        }
    }
}

/// Errors surfaced by [`crate::trim::trim_image`].
#[derive(thiserror::Error, Debug)]
pub enum TrimError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("integrity verification of trimmed output failed: {0}")]
    VerificationFailed(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Errors surfaced by [`crate::verify::verify_image`].
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("operation cancelled")]
    Cancelled,
}
