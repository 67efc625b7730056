//! Read-only loopback mounting of a partition inside a raw image.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::partition::Partition;
use crate::process::Cmd;

/// One set of `mount` options to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountAttempt {
    /// Explicit filesystem type (`-t`), if any.
    pub fstype: Option<String>,
    /// Comma-separated `-o` options.
    pub options: String,
}

impl MountAttempt {
    /// Arguments to `mount`, excluding source and target.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(fstype) = &self.fstype {
            args.push("-t".to_string());
            args.push(fstype.clone());
        }
        args.push("-o".to_string());
        args.push(self.options.clone());
        args
    }
}

impl fmt::Display for MountAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// The ordered option sets used to mount `partition`.
///
/// Plain loop mount first, then with the filesystem type parted reported,
/// then without journal recovery for filesystems left dirty.
pub fn mount_attempts(partition: &Partition) -> Vec<MountAttempt> {
    let offset = partition.start;
    let mut attempts = vec![MountAttempt {
        fstype: None,
        options: format!("loop,ro,offset={offset}"),
    }];
    if !partition.filesystem.is_empty() {
        attempts.push(MountAttempt {
            fstype: Some(partition.filesystem.clone()),
            options: format!("loop,ro,offset={offset}"),
        });
    }
    attempts.push(MountAttempt {
        fstype: None,
        options: format!("loop,ro,norecovery,offset={offset}"),
    });
    attempts
}

/// A partition mounted on a private temporary directory.
///
/// Unmounted when dropped.
#[derive(Debug)]
pub struct TempMount {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
    umount: String,
    sudo: Option<String>,
}

impl TempMount {
    /// Mount `partition` of `raw_image` read-only, trying each option set in turn.
    pub fn mount(raw_image: &Path, partition: &Partition, config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.mount_root)
            .with_context(|| format!("Failed to create {}", config.mount_root.display()))?;
        let dir = tempfile::Builder::new()
            .prefix("ova2rootfs-")
            .tempdir_in(&config.mount_root)
            .context("Failed to create mount point")?;
        let path = dir.path().to_path_buf();
        tracing::info!("Attempting to mount RAW file to {}", path.display());

        for attempt in mount_attempts(partition) {
            let cmd = Cmd::new(&config.mount)
                .args(attempt.args())
                .arg_path(raw_image)
                .arg_path(&path)
                .elevated(config.sudo())
                .allow_fail();
            tracing::info!("Trying mount command: {}", cmd.display());

            let result = cmd.run()?;
            if result.success() {
                tracing::info!("Mount successful");
                return Ok(Self {
                    dir: Some(dir),
                    path,
                    umount: config.umount.clone(),
                    sudo: config.sudo.clone(),
                });
            }
            tracing::warn!("Mount attempt failed: {}", result.stderr_trimmed());
        }

        bail!(
            "All mount attempts failed for partition {} of {}",
            partition,
            raw_image.display()
        )
    }

    /// Where the filesystem is mounted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unmount(&self) -> Result<()> {
        Cmd::new(&self.umount)
            .arg_path(&self.path)
            .elevated(self.sudo.as_deref())
            .error_msg(format!("Failed to unmount {}", self.path.display()))
            .run()?;
        Ok(())
    }
}

impl Drop for TempMount {
    fn drop(&mut self) {
        match self.unmount() {
            Ok(()) => {
                if let Some(dir) = self.dir.take() {
                    if let Err(e) = dir.close() {
                        tracing::warn!("Failed to remove mount point: {e}");
                    }
                }
            }
            Err(e) => {
                // Never recurse into a directory that may still be mounted
                if let Some(dir) = self.dir.take() {
                    let _ = dir.keep();
                }
                tracing::warn!("{e:#}");
            }
        }
    }
}
