//! Configuration management for ova2rootfs.
//!
//! Reads tool locations and the privilege wrapper from environment
//! variables. `main` loads a `.env` file first, so the process environment
//! takes precedence over it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Default privilege wrapper for mount, umount, ls and tar.
pub const DEFAULT_SUDO: &str = "sudo";

/// Host configuration: which programs to run and where to mount.
#[derive(Debug, Clone)]
pub struct Config {
    /// Archiver used both to unpack OVAs and to write the rootfs tarball.
    pub tar: String,
    /// Disk image converter.
    pub qemu_img: String,
    /// Partition table lister.
    pub parted: String,
    pub mount: String,
    pub umount: String,
    /// Lists the mounted filesystem for the operator.
    pub ls: String,
    /// Wrapper for commands that need root. `None` runs them directly.
    pub sudo: Option<String>,
    /// Parent directory of the per-run mount points.
    pub mount_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tar: "tar".to_string(),
            qemu_img: "qemu-img".to_string(),
            parted: "parted".to_string(),
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            ls: "ls".to_string(),
            sudo: Some(DEFAULT_SUDO.to_string()),
            mount_root: std::env::temp_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from `KEY=value` pairs, falling back to defaults.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with("OVA2ROOTFS_"))
            .collect();
        let defaults = Self::default();

        let program = |key: &str, default: String| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(default)
        };

        // An empty OVA2ROOTFS_SUDO explicitly disables the wrapper
        let sudo = match vars.get("OVA2ROOTFS_SUDO") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => defaults.sudo,
        };

        let mount_root = vars
            .get("OVA2ROOTFS_MOUNT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.mount_root);

        Self {
            tar: program("OVA2ROOTFS_TAR", defaults.tar),
            qemu_img: program("OVA2ROOTFS_QEMU_IMG", defaults.qemu_img),
            parted: program("OVA2ROOTFS_PARTED", defaults.parted),
            mount: program("OVA2ROOTFS_MOUNT", defaults.mount),
            umount: program("OVA2ROOTFS_UMOUNT", defaults.umount),
            ls: program("OVA2ROOTFS_LS", defaults.ls),
            sudo,
            mount_root,
        }
    }

    /// The privilege wrapper as passed to [`crate::process::Cmd::elevated`].
    pub fn sudo(&self) -> Option<&str> {
        self.sudo.as_deref()
    }

    /// Render the configuration for debug logging.
    pub fn describe(&self) -> String {
        let mut out = String::from("Configuration:");
        let _ = write!(out, "\n  OVA2ROOTFS_TAR: {}", self.tar);
        let _ = write!(out, "\n  OVA2ROOTFS_QEMU_IMG: {}", self.qemu_img);
        let _ = write!(out, "\n  OVA2ROOTFS_PARTED: {}", self.parted);
        let _ = write!(out, "\n  OVA2ROOTFS_MOUNT: {}", self.mount);
        let _ = write!(out, "\n  OVA2ROOTFS_UMOUNT: {}", self.umount);
        let _ = write!(out, "\n  OVA2ROOTFS_LS: {}", self.ls);
        let _ = write!(
            out,
            "\n  OVA2ROOTFS_SUDO: {}",
            self.sudo.as_deref().unwrap_or("(disabled)")
        );
        let _ = write!(out, "\n  OVA2ROOTFS_MOUNT_DIR: {}", self.mount_root.display());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new());
        assert_eq!(config.tar, "tar");
        assert_eq!(config.qemu_img, "qemu-img");
        assert_eq!(config.parted, "parted");
        assert_eq!(config.sudo(), Some("sudo"));
        assert_eq!(config.mount_root, std::env::temp_dir());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("OVA2ROOTFS_QEMU_IMG", "/opt/qemu/bin/qemu-img"),
            ("OVA2ROOTFS_SUDO", "doas"),
            ("OVA2ROOTFS_MOUNT_DIR", "/run/ova2rootfs"),
            ("UNRELATED", "ignored"),
        ]));
        assert_eq!(config.qemu_img, "/opt/qemu/bin/qemu-img");
        assert_eq!(config.sudo(), Some("doas"));
        assert_eq!(config.mount_root, PathBuf::from("/run/ova2rootfs"));
        assert_eq!(config.tar, "tar");
    }

    #[test]
    fn test_empty_sudo_disables_wrapper() {
        let config = Config::from_vars(vars(&[("OVA2ROOTFS_SUDO", "")]));
        assert_eq!(config.sudo(), None);
    }

    #[test]
    fn test_empty_program_keeps_default() {
        let config = Config::from_vars(vars(&[("OVA2ROOTFS_PARTED", "  ")]));
        assert_eq!(config.parted, "parted");
    }

    #[test]
    fn test_describe() {
        let config = Config::from_vars(vars(&[("OVA2ROOTFS_SUDO", "")]));
        let text = config.describe();
        assert!(text.contains("OVA2ROOTFS_SUDO: (disabled)"));
        assert!(text.contains("OVA2ROOTFS_TAR: tar"));
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        std::env::set_var("OVA2ROOTFS_UMOUNT", "/usr/bin/umount");
        let config = Config::load();
        std::env::remove_var("OVA2ROOTFS_UMOUNT");
        assert_eq!(config.umount, "/usr/bin/umount");
    }
}
