//! Delegation of atlas construction to the external texture packer.

use std::{fs, path::Path, process::Command};

use contentpipe_shared::log::{error, info};

use crate::{Error, Result};

/// Name of the external texture packer executable.
pub const PACKER_EXECUTABLE: &str = "crunch";

/// Seam to the external texture packer. The default implementation spawns
/// the packer executable; tests substitute a recording implementation.
pub trait PackerBackend {
    /// Packs the images in `source_folder` into an atlas at `destination`.
    fn pack(&self, source_folder: &Path, destination: &Path) -> Result<()>;
}

/// Spawns the `crunch` executable with the source folder and destination path.
pub struct CrunchPacker;

impl PackerBackend for CrunchPacker {
    fn pack(&self, source_folder: &Path, destination: &Path) -> Result<()> {
        let status = Command::new(PACKER_EXECUTABLE).arg(source_folder).arg(destination).status()?;
        if !status.success() {
            return Err(Error::AtlasPackerFailed(source_folder.to_owned()));
        }
        Ok(())
    }
}

/// Wraps the call to the external packer for a single atlas-typed manifest
/// entry.
pub struct AtlasInvoker {
    backend: Box<dyn PackerBackend>,
}

impl AtlasInvoker {
    pub fn new(backend: Box<dyn PackerBackend>) -> Self {
        Self { backend }
    }

    /// Builds the atlas for `source_folder` into `destination`.
    ///
    /// Atlas entries are rebuilt on every run; there is deliberately no
    /// modification-time caching for them. A missing source folder is
    /// reported and skipped instead of aborting the run.
    pub fn build_atlas(&self, source_folder: &Path, destination: &Path) -> Result<()> {
        if !source_folder.exists() {
            error!("Atlas source folder '{}' does not exist", source_folder.display());
            return Ok(());
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("Packing atlas '{}' to '{}'", source_folder.display(), destination.display());
        self.backend.pack(source_folder, destination)
    }
}

impl Default for AtlasInvoker {
    fn default() -> Self {
        Self::new(Box::new(CrunchPacker))
    }
}

/// Records packer invocations instead of spawning the external tool.
#[cfg(test)]
pub(crate) struct RecordingPacker {
    pub(crate) invocations: std::rc::Rc<std::cell::RefCell<Vec<(std::path::PathBuf, std::path::PathBuf)>>>,
}

#[cfg(test)]
impl PackerBackend for RecordingPacker {
    fn pack(&self, source_folder: &Path, destination: &Path) -> Result<()> {
        self.invocations.borrow_mut().push((source_folder.to_owned(), destination.to_owned()));
        Ok(())
    }
}
