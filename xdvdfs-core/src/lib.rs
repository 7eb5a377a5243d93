//! Engine for converting between Redump-style full-disc XDVDFS dumps and
//! trimmed XISO images, and for verifying the integrity of an existing
//! XISO.
//!
//! The crate is organized leaves-first, matching the dependency order of
//! the on-disc structures themselves: [`sector`] has no dependents inside
//! this crate, [`volume`] and [`dirent`] build on it, [`walk`] builds on
//! those, and [`range`], [`trim`], [`verify`] build on the walker.

#[allow(unused)]
macro_rules! dbg_trace {
    ($($x:tt)*) => {
        #[cfg(feature = "logging")]
        log::trace!($($x)*);
    };
}

#[allow(unused)]
macro_rules! dbg_debug {
    ($($x:tt)*) => {
        #[cfg(feature = "logging")]
        log::debug!($($x)*);
    };
}

pub mod cancel;
pub mod dirent;
pub mod error;
pub mod progress;
pub mod range;
pub mod sector;
pub mod trim;
pub mod verify;
pub mod volume;
pub mod walk;

#[cfg(test)]
pub(crate) mod testutil;
