//! Shared test utilities: a sandbox of mock host tools.
//!
//! Every mock appends its command line to `calls.log` so tests can assert
//! what ran, and in which order.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ova2rootfs::config::Config;
use ova2rootfs::pipeline::Options;

/// A disk with a small boot partition and a large ext4 root.
pub const PARTED_OUTPUT: &str = "BYT;
/out/disk1.raw:21474836480B:file:512:512:msdos::;
1:1048576B:1074790399B:1073741824B:ext4::boot;
2:1074790400B:21474836479B:20400046080B:ext4::;
";

/// Mount succeeds on the first try and populates a tiny rootfs.
pub const MOUNT_OK: &str = r#"for last; do :; done
mkdir -p "$last/etc" "$last/bin"
echo ID=alpine > "$last/etc/os-release"
"#;

/// Mount only succeeds once journal recovery is disabled.
pub const MOUNT_NEEDS_NORECOVERY: &str = r#"case "$*" in
  *norecovery*) ;;
  *) echo "mount: wrong fs type, bad option, bad superblock" >&2; exit 32 ;;
esac
for last; do :; done
mkdir -p "$last/etc"
"#;

/// Mount never succeeds.
pub const MOUNT_FAILS: &str = r#"echo "mount: unknown filesystem type" >&2
exit 32
"#;

/// OVA extraction drops a descriptor and a disk.
pub const TAR_OK: &str = r#"case "$1" in
  -xf) echo ovf > "$4/appliance.ovf"; echo vmdk > "$4/disk1.vmdk" ;;
  -C) echo rootfs > "$4" ;;
esac
"#;

/// OVA extraction yields no disk image.
pub const TAR_NO_DISK: &str = r#"case "$1" in
  -xf) echo ovf > "$4/appliance.ovf" ;;
  -C) echo rootfs > "$4" ;;
esac
"#;

/// Archiving writes part of the tarball, then fails.
pub const TAR_ARCHIVE_FAILS: &str = r#"case "$1" in
  -C) echo partial > "$4"; echo "tar: write error" >&2; exit 2 ;;
esac
"#;

/// Sandbox holding mock tools, an input directory and an output directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub bin: PathBuf,
    pub inputs: PathBuf,
    pub output: PathBuf,
    pub mount_root: PathBuf,
    pub calls: PathBuf,
}

impl TestEnv {
    /// Create a sandbox where every tool succeeds.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let bin = base.join("bin");
        let inputs = base.join("inputs");
        let mount_root = base.join("mnt");
        fs::create_dir_all(&bin).expect("Failed to create bin dir");
        fs::create_dir_all(&inputs).expect("Failed to create inputs dir");

        let env = Self {
            bin,
            inputs,
            output: base.join("out"),
            mount_root,
            calls: base.join("calls.log"),
            _temp_dir: temp_dir,
        };

        env.tool(
            "qemu-img",
            r#"for last; do :; done
printf '    (0.00/100%%)\r    (50.00/100%%)\r    (100.00/100%%)\r'
echo raw > "$last"
"#,
        );
        env.tool("parted", &format!("cat <<'EOF'\n{PARTED_OUTPUT}EOF\n"));
        env.tool("mount", MOUNT_OK);
        env.tool("umount", "");
        env.tool("tar", TAR_OK);
        env
    }

    /// Write (or replace) a mock tool with the given shell body.
    pub fn tool(&self, name: &str, body: &str) {
        let path = self.bin.join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{}'\n{body}",
            self.calls.display()
        );
        fs::write(&path, script).expect("Failed to write mock tool");

        let mut perms = fs::metadata(&path)
            .expect("Failed to get metadata")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("Failed to set permissions");
    }

    /// Create an input file with the given name.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.inputs.join(name);
        fs::write(&path, b"image").expect("Failed to create input");
        path
    }

    /// Configuration pointing every tool at the mocks.
    pub fn config(&self) -> Config {
        let bin = |name: &str| self.bin.join(name).to_string_lossy().into_owned();
        Config {
            tar: bin("tar"),
            qemu_img: bin("qemu-img"),
            parted: bin("parted"),
            mount: bin("mount"),
            umount: bin("umount"),
            ls: "ls".to_string(),
            sudo: None,
            mount_root: self.mount_root.clone(),
        }
    }

    /// The same configuration as environment variables for the binary.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let config = self.config();
        vec![
            ("OVA2ROOTFS_TAR".into(), config.tar),
            ("OVA2ROOTFS_QEMU_IMG".into(), config.qemu_img),
            ("OVA2ROOTFS_PARTED".into(), config.parted),
            ("OVA2ROOTFS_MOUNT".into(), config.mount),
            ("OVA2ROOTFS_UMOUNT".into(), config.umount),
            ("OVA2ROOTFS_SUDO".into(), String::new()),
            (
                "OVA2ROOTFS_MOUNT_DIR".into(),
                self.mount_root.to_string_lossy().into_owned(),
            ),
        ]
    }

    pub fn options(&self, input: &Path, keep_files: bool) -> Options {
        Options {
            input: input.to_path_buf(),
            output: self.output.clone(),
            keep_files,
            verbose: false,
        }
    }

    /// Every recorded tool invocation, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Names of the tools that ran, in order.
    pub fn tools_run(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.split_whitespace().next().map(str::to_string))
            .collect()
    }

    /// True if no per-run mount point was left behind.
    pub fn mount_root_is_clean(&self) -> bool {
        fs::read_dir(&self.mount_root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}
