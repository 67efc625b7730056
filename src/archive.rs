//! Rootfs tarball creation.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::process::Cmd;
use crate::timing::Timer;

/// Path of the tarball produced for `input` in `output_dir`.
pub fn tarball_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "rootfs".into());
    name.push(".tar.gz");
    output_dir.join(name)
}

/// Archive the contents of `root` into a gzip-compressed tarball.
///
/// Runs through the privilege wrapper so root-only files are readable.
/// Equivalent to: `tar -C <root> -czf <tarball> .`
pub fn create_tarball(root: &Path, tarball: &Path, config: &Config) -> Result<()> {
    tracing::info!("Creating tar file: {}", tarball.display());
    let timer = Timer::start("Archiving");

    Cmd::new(&config.tar)
        .arg("-C")
        .arg_path(root)
        .arg("-czf")
        .arg_path(tarball)
        .arg(".")
        .elevated(config.sudo())
        .error_msg(format!("Failed to create {}", tarball.display()))
        .run_with_spinner("Archiving root filesystem")?;

    timer.finish();
    Ok(())
}
