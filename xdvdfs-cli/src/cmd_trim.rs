use clap::Args;
use std::path::PathBuf;

use xdvdfs_core::cancel::CancelFlag;
use xdvdfs_core::trim::{trim_image, TrimOutcome};
use xdvdfs_core::walk::SystemUpdateFilter;

use crate::progress::BarProgressReporter;

#[derive(Args)]
pub struct TrimArgs {
    /// Source image: a full-disc Redump dump or an existing XISO.
    pub source: PathBuf,

    /// Destination path for the trimmed XISO.
    pub dest: PathBuf,

    /// Drop the $SystemUpdate directory and its contents from the output.
    #[arg(long)]
    pub skip_system_update: bool,

    /// Like --skip-system-update, but also drops disc-specific variants
    /// whose name merely starts with $SystemUpdate.
    #[arg(long)]
    pub system_update_prefix_match: bool,

    /// Re-walk the output's directory tree before reporting success
    /// (structural only; does not re-read file content — use the
    /// `verify` subcommand with `--surface-scan` for that).
    #[arg(long)]
    pub check_integrity: bool,
}

pub fn run(args: &TrimArgs) -> anyhow::Result<()> {
    let cancel = CancelFlag::new();
    let mut progress = BarProgressReporter::new();

    let filter = if args.system_update_prefix_match {
        SystemUpdateFilter::Prefix
    } else if args.skip_system_update {
        SystemUpdateFilter::Exact
    } else {
        SystemUpdateFilter::Disabled
    };

    let outcome = trim_image(
        &args.source,
        &args.dest,
        filter,
        args.check_integrity,
        &cancel,
        &mut progress,
    )?;

    drop(progress);

    match outcome {
        TrimOutcome::Converted => println!("converted: {}", args.dest.display()),
        TrimOutcome::AlreadyOptimized => println!("already optimized, no output written"),
    }

    Ok(())
}
