//! Partition discovery for raw disk images.
//!
//! Runs `parted -ms <image> unit B print` and turns its machine-readable
//! output into [`Partition`] records. Output looks like:
//!
//! ```text
//! BYT;
//! /out/disk.raw:21474836480B:file:512:512:msdos::;
//! 1:1048576B:1074790399B:1073741824B:ext4::boot;
//! 2:1074790400B:21474836479B:20400046080B:lvm::lvm;
//! ```

use anyhow::{bail, Result};
use std::fmt;
use std::num::ParseIntError;
use std::path::Path;

use crate::config::Config;
use crate::process::Cmd;

/// Header emitted by `parted -m` when printing in byte units.
const HEADER: &str = "BYT;";

/// One partition of a disk image. Offsets and sizes are in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub number: u32,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    /// Filesystem type as reported by parted; empty when unknown.
    pub filesystem: String,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = if self.filesystem.is_empty() {
            "unknown"
        } else {
            &self.filesystem
        };
        write!(
            f,
            "#{} {} (offset {}, {} bytes)",
            self.number, fs, self.start, self.size
        )
    }
}

/// List the partitions of a raw image.
pub fn list_partitions(raw_image: &Path, config: &Config) -> Result<Vec<Partition>> {
    tracing::info!("Getting partition information");
    let result = Cmd::new(&config.parted)
        .arg("-ms")
        .arg_path(raw_image)
        .args(["unit", "B", "print"])
        .error_msg("parted failed to read the partition table")
        .run()?;
    parse_parted_output(&result.stdout)
}

/// Parse `parted -ms ... unit B print` output into partitions, in order.
///
/// Malformed entries are skipped with a warning. Fails if nothing usable
/// remains.
pub fn parse_parted_output(output: &str) -> Result<Vec<Partition>> {
    let mut partitions = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(HEADER) {
            continue;
        }
        let line = line.strip_suffix(';').unwrap_or(line);
        // Device line: parted echoes the device or image path
        if line.starts_with('/') {
            continue;
        }

        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 5 {
            continue;
        }

        match parse_fields(&fields) {
            Ok(partition) => partitions.push(partition),
            Err(e) => {
                tracing::warn!("Skipping invalid partition entry: {}", line);
                tracing::warn!("Error: {}", e);
            }
        }
    }

    if partitions.is_empty() {
        tracing::error!("No valid partitions found. Raw parted output:\n{}", output);
        bail!(
            "No valid partitions found in the raw image. parted output:\n{}",
            output
        );
    }

    Ok(partitions)
}

fn parse_fields(fields: &[&str]) -> Result<Partition, ParseIntError> {
    let bytes = |field: &str| field.trim().trim_end_matches('B').parse::<u64>();
    Ok(Partition {
        number: fields[0].trim().parse()?,
        start: bytes(fields[1])?,
        end: bytes(fields[2])?,
        size: bytes(fields[3])?,
        filesystem: fields[4].to_string(),
    })
}

/// Pick the partition most likely to hold the root filesystem: the largest.
///
/// Ties go to the first partition listed.
pub fn select_largest(partitions: &[Partition]) -> Option<&Partition> {
    partitions
        .iter()
        .fold(None, |best: Option<&Partition>, p| match best {
            Some(b) if b.size >= p.size => Some(b),
            _ => Some(p),
        })
}
