use std::path::Path;

use include_dir::{Dir, include_dir};
use tracing::info;

use crate::InitArgs;

/// The embedded starter profile: configuration templates plus a small sample
/// input tree.
static STARTER: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/starter");

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let site_dir = &args.site.site_dir;

    info!("Initializing site in '{}'", site_dir.display());
    extract(&STARTER, site_dir)?;

    Ok(())
}

/// Copy the embedded tree into the site directory, leaving any file that
/// already exists alone so re-running `init` never clobbers edits.
fn extract(dir: &Dir, site_dir: &Path) -> Result<(), anyhow::Error> {
    for entry in dir.entries() {
        match entry {
            include_dir::DirEntry::Dir(subdir) => extract(subdir, site_dir)?,
            include_dir::DirEntry::File(file) => {
                let target = site_dir.join(file.path());

                if target.exists() {
                    info!("Skipping '{}', it already exists", target.display());
                    continue;
                }

                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, file.contents())?;

                info!("Creating '{}'", target.display());
            }
        }
    }

    Ok(())
}
