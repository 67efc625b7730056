//! Input validation and OVA unpacking.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::process::Cmd;

/// The kinds of input the converter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Tar archive bundling one or more VMDK disks with metadata.
    Ova,
    /// A bare VMDK disk image.
    Vmdk,
}

impl InputKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ova" => Some(Self::Ova),
            "vmdk" => Some(Self::Vmdk),
            _ => None,
        }
    }
}

/// Validate the input path and determine its kind.
///
/// Runs no external command.
pub fn classify_input(input: &Path) -> Result<InputKind> {
    let Some(kind) = InputKind::from_path(input) else {
        bail!(
            "Input file must be either .ova or .vmdk: {}",
            input.display()
        );
    };
    if !input.is_file() {
        bail!("Input file not found: {}", input.display());
    }
    Ok(kind)
}

/// Unpack an OVA into `temp_dir` and return the disk image it contains.
pub fn extract_ova(ova: &Path, temp_dir: &Path, config: &Config) -> Result<PathBuf> {
    tracing::info!("Extracting OVA file: {}", ova.display());
    Cmd::new(&config.tar)
        .arg("-xf")
        .arg_path(ova)
        .arg("-C")
        .arg_path(temp_dir)
        .error_msg(format!("Failed to extract {}", ova.display()))
        .run_with_spinner("Extracting OVA")?;

    find_disk_image(temp_dir)?
        .with_context(|| format!("No VMDK file found in the OVA archive {}", ova.display()))
}

/// Find the first `.vmdk` file in `dir`, in name order.
pub fn find_disk_image(dir: &Path) -> Result<Option<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && InputKind::from_path(path) == Some(InputKind::Vmdk))
        .collect();
    images.sort();

    if images.len() > 1 {
        tracing::warn!(
            "OVA contains {} disk images, using {}",
            images.len(),
            images[0].display()
        );
    }
    Ok(images.into_iter().next())
}
