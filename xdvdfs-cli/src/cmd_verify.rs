use clap::Args;
use std::path::PathBuf;

use xdvdfs_core::cancel::CancelFlag;
use xdvdfs_core::verify::{verify_image_with_progress, VerifyOutcome};
use xdvdfs_core::walk::SystemUpdateFilter;

use crate::progress::BarProgressReporter;

#[derive(Args)]
pub struct VerifyArgs {
    /// Image to verify.
    pub source: PathBuf,

    /// Also read every file's content back, not just the directory tree.
    #[arg(long)]
    pub surface_scan: bool,
}

pub fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let cancel = CancelFlag::new();
    let mut progress = BarProgressReporter::new();

    // The verifier always walks the full tree, $SystemUpdate included,
    // since it is checking the image that exists, not deciding what to
    // keep.
    let outcome = verify_image_with_progress(
        &args.source,
        SystemUpdateFilter::Disabled,
        args.surface_scan,
        &cancel,
        &mut progress,
    )?;

    drop(progress);

    match outcome {
        VerifyOutcome::Passed => {
            println!("passed");
            Ok(())
        }
        VerifyOutcome::Failed { file, reason } => {
            anyhow::bail!("verification failed: {file}: {reason}")
        }
    }
}
