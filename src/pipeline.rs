//! The conversion pipeline: OVA/VMDK in, rootfs tarball out.
//!
//! Steps run strictly in order and each external command runs once (mount
//! fallbacks aside). Whatever happens, [`Workspace`] unmounts the image
//! and removes intermediates when it goes out of scope.

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::archive;
use crate::config::Config;
use crate::confirm;
use crate::convert::{convert_to_raw, raw_image_path};
use crate::extract::{self, InputKind};
use crate::mount::TempMount;
use crate::partition;
use crate::preflight;

/// Name of the extraction directory inside the output directory.
pub const TEMP_DIR_NAME: &str = "temp";

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct Options {
    /// The `.ova` or `.vmdk` to convert.
    pub input: PathBuf,
    /// Directory receiving the raw image and the tarball.
    pub output: PathBuf,
    /// Keep the raw image and extracted files after the run.
    pub keep_files: bool,
    pub verbose: bool,
}

/// Files left behind by a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// The raw disk image, if `keep_files` kept it.
    pub raw: Option<PathBuf>,
    /// The rootfs tarball, ready for `docker import`.
    pub tarball: PathBuf,
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Artifacts),
    /// The operator rejected the mounted filesystem.
    Declined,
}

/// Run the pipeline, logging any error, and return the artifacts on success.
///
/// Errors and a declined confirmation both yield `None`.
pub fn convert<R, W>(
    options: Options,
    config: Config,
    input: &mut R,
    output: &mut W,
) -> Option<Artifacts>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    match Pipeline::new(options, config).run(input, output) {
        Ok(Outcome::Completed(artifacts)) => Some(artifacts),
        Ok(Outcome::Declined) => None,
        Err(e) => {
            tracing::error!("An error occurred: {e:#}");
            None
        }
    }
}

/// A single conversion run.
#[derive(Debug)]
pub struct Pipeline {
    options: Options,
    config: Config,
}

impl Pipeline {
    pub fn new(options: Options, config: Config) -> Self {
        Self { options, config }
    }

    /// Convert the input, prompting on `input`/`output` before archiving.
    pub fn run<R, W>(&self, input: &mut R, output: &mut W) -> Result<Outcome>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        let config = &self.config;
        let source = &self.options.input;
        let output_dir = &self.options.output;

        // Nothing external runs before these two checks pass
        let kind = extract::classify_input(source)?;
        preflight::run_preflight_or_fail(kind, config)?;
        tracing::debug!("{}", config.describe());

        let mut workspace = Workspace::create(output_dir, self.options.keep_files)?;

        let disk_image = match kind {
            InputKind::Ova => extract::extract_ova(source, workspace.temp_dir(), config)?,
            InputKind::Vmdk => source.clone(),
        };

        let raw = raw_image_path(&disk_image, output_dir);
        workspace.raw = Some(raw.clone());
        convert_to_raw(&disk_image, &raw, config)?;

        let partitions = partition::list_partitions(&raw, config)?;
        for p in &partitions {
            tracing::debug!("Found partition {}", p);
        }
        let root = partition::select_largest(&partitions)
            .context("No partitions found in the RAW image")?;
        tracing::info!("Selected partition: {}", root);

        let mount_point = workspace.attach(TempMount::mount(&raw, root, config)?);

        tracing::info!("Displaying contents of the mounted filesystem:");
        let listing = confirm::list_contents(&mount_point, config)?;
        write!(output, "{listing}")?;

        if !confirm::confirm(input, output)? {
            tracing::info!("User indicated the filesystem is not correct. Stopping conversion.");
            return Ok(Outcome::Declined);
        }

        let tarball = archive::tarball_path(source, output_dir);
        workspace.partial_tarball = Some(tarball.clone());
        archive::create_tarball(&mount_point, &tarball, config)?;
        workspace.partial_tarball = None;

        let raw = self.options.keep_files.then_some(raw);
        Ok(Outcome::Completed(Artifacts { raw, tarball }))
    }
}

/// Intermediate state of a run, cleaned up on drop.
///
/// Unmounts first, then removes a partial tarball, then (unless
/// `keep_files`) the raw image and the extraction directory.
#[derive(Debug)]
struct Workspace {
    temp_dir: PathBuf,
    keep_files: bool,
    raw: Option<PathBuf>,
    partial_tarball: Option<PathBuf>,
    mount: Option<TempMount>,
}

impl Workspace {
    fn create(output_dir: &Path, keep_files: bool) -> Result<Self> {
        let temp_dir = output_dir.join(TEMP_DIR_NAME);
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("Failed to create {}", temp_dir.display()))?;
        Ok(Self {
            temp_dir,
            keep_files,
            raw: None,
            partial_tarball: None,
            mount: None,
        })
    }

    fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Take ownership of a mount and return where it is mounted.
    fn attach(&mut self, mount: TempMount) -> PathBuf {
        let path = mount.path().to_path_buf();
        self.mount = Some(mount);
        path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        tracing::info!("Cleaning up");
        drop(self.mount.take());

        if let Some(tarball) = self.partial_tarball.take() {
            remove_file_if_exists(&tarball);
        }

        if self.keep_files {
            tracing::info!("Keeping extracted files in: {}", self.temp_dir.display());
            return;
        }

        tracing::info!("Removing temporary files");
        if let Some(raw) = self.raw.take() {
            remove_file_if_exists(&raw);
        }
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

fn remove_file_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_removes_intermediates() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("disk.raw");
        {
            let mut ws = Workspace::create(dir.path(), false).unwrap();
            fs::write(ws.temp_dir().join("disk.vmdk"), b"").unwrap();
            fs::write(&raw, b"raw").unwrap();
            ws.raw = Some(raw.clone());
        }
        assert!(!raw.exists());
        assert!(!dir.path().join(TEMP_DIR_NAME).exists());
    }

    #[test]
    fn test_workspace_keeps_files() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("disk.raw");
        {
            let mut ws = Workspace::create(dir.path(), true).unwrap();
            fs::write(&raw, b"raw").unwrap();
            ws.raw = Some(raw.clone());
        }
        assert!(raw.exists());
        assert!(dir.path().join(TEMP_DIR_NAME).is_dir());
    }

    #[test]
    fn test_workspace_removes_partial_tarball_even_when_keeping() {
        let dir = TempDir::new().unwrap();
        let tarball = dir.path().join("disk.tar.gz");
        {
            let mut ws = Workspace::create(dir.path(), true).unwrap();
            fs::write(&tarball, b"half").unwrap();
            ws.partial_tarball = Some(tarball.clone());
        }
        assert!(!tarball.exists());
    }

    #[test]
    fn test_bad_extension_returns_none_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let options = Options {
            input: dir.path().join("disk.qcow2"),
            output: output.clone(),
            keep_files: false,
            verbose: false,
        };
        let mut input = Cursor::new(Vec::new());
        let mut prompt = Vec::new();
        assert!(convert(options, Config::default(), &mut input, &mut prompt).is_none());
        assert!(!output.exists());
        assert!(prompt.is_empty());
    }
}
