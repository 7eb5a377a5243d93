use clap::Args;
use std::fs::File;
use std::path::PathBuf;

use xdvdfs_core::cancel::CancelFlag;
use xdvdfs_core::sector::SectorStream;
use xdvdfs_core::volume;
use xdvdfs_core::walk::{self, SystemUpdateFilter, WalkItem};

#[derive(Args)]
pub struct InfoArgs {
    /// Image to inspect.
    pub source: PathBuf,
}

pub fn run(args: &InfoArgs) -> anyhow::Result<()> {
    let file = File::open(&args.source)?;
    let mut stream = SectorStream::new(file);

    let info = volume::find_volume(&mut stream)?;
    println!("{0: <20} {1:#x}", "Volume offset:", stream.volume_offset());
    println!("{0: <20} Sector {1} ({2} bytes)", "Root entry:", info.root_dir_sector, info.root_dir_size);

    let walked = walk::walk(
        &mut stream,
        info.root_dir_sector,
        info.root_dir_size,
        SystemUpdateFilter::Disabled,
        &CancelFlag::new(),
    )?;

    let mut file_count = 0u64;
    let mut dir_count = 0u64;
    let mut table_count = 0u64;
    let mut total_bytes = 0u64;

    for item in &walked.items {
        match item {
            WalkItem::TableHeader { .. } => table_count += 1,
            WalkItem::Entry(entry) => {
                if entry.attributes.directory() {
                    dir_count += 1;
                } else {
                    file_count += 1;
                    total_bytes += entry.file_size as u64;
                }
            }
        }
    }

    println!("{0: <20} {1}", "Directory tables:", table_count);
    println!("{0: <20} {1}", "Directories:", dir_count);
    println!("{0: <20} {1}", "Files:", file_count);
    println!("{0: <20} {1} bytes", "Total file data:", total_bytes);

    Ok(())
}
