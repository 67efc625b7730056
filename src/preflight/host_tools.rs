//! Host tool availability checks.

use crate::config::Config;
use crate::extract::InputKind;
use crate::process;

use super::types::CheckResult;

/// An external program a conversion depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Program name or path, as configured.
    pub program: String,
    /// Package that usually provides it.
    pub package: &'static str,
    pub purpose: &'static str,
}

/// The programs a conversion of `kind` input will run.
pub fn required_tools(kind: InputKind, config: &Config) -> Vec<Tool> {
    let tool = |program: &str, package, purpose| Tool {
        program: program.to_string(),
        package,
        purpose,
    };

    let tar_purpose = match kind {
        InputKind::Ova => "Required to extract the OVA and archive the rootfs",
        InputKind::Vmdk => "Required to archive the rootfs",
    };

    let mut tools = vec![
        tool(&config.tar, "tar", tar_purpose),
        tool(&config.qemu_img, "qemu-utils", "Required to convert VMDK to raw"),
        tool(&config.parted, "parted", "Required to read the partition table"),
        tool(&config.mount, "util-linux", "Required to loop-mount the root partition"),
        tool(&config.umount, "util-linux", "Required to unmount the root partition"),
        tool(&config.ls, "coreutils", "Required to show the mounted filesystem"),
    ];
    if let Some(sudo) = config.sudo() {
        tools.push(tool(sudo, "sudo", "Required to mount and read the image as root"));
    }
    tools
}

/// Check every required tool is installed.
pub fn check_host_tools(kind: InputKind, config: &Config) -> Vec<CheckResult> {
    required_tools(kind, config)
        .iter()
        .map(check_tool_exists)
        .collect()
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &Tool) -> CheckResult {
    match process::which(&tool.program) {
        Some(path) => CheckResult::pass_with(&tool.program, &path),
        None => CheckResult::fail(
            &tool.program,
            &format!(
                "Not found. Install '{}' package. {}",
                tool.package, tool.purpose
            ),
        ),
    }
}
