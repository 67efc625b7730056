//! Disk image conversion via `qemu-img`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::process::Cmd;
use crate::progress;
use crate::timing::Timer;

/// Path of the raw image written for `disk_image` in `output_dir`.
pub fn raw_image_path(disk_image: &Path, output_dir: &Path) -> PathBuf {
    let stem = disk_image
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "disk".into());
    let mut name = stem;
    name.push(".raw");
    output_dir.join(name)
}

/// Convert a VMDK into a raw image.
///
/// Equivalent to: `qemu-img convert -p -f vmdk <src> -O raw <dst>`
pub fn convert_to_raw(vmdk: &Path, raw: &Path, config: &Config) -> Result<()> {
    tracing::info!("Converting {} to RAW format", vmdk.display());
    let timer = Timer::start("Disk conversion");

    let pb = progress::percent_bar("Converting");
    let result = Cmd::new(&config.qemu_img)
        .args(["convert", "-p", "-f", "vmdk"])
        .arg_path(vmdk)
        .args(["-O", "raw"])
        .arg_path(raw)
        .error_msg("qemu-img convert failed")
        .run_with_progress(|percent| pb.set_position(percent as u64));
    pb.finish_and_clear();
    result?;

    timer.finish();
    Ok(())
}
