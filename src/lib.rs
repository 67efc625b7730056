//! ova2rootfs - turn a virtual machine image into a container rootfs.
//!
//! Converts an OVA or VMDK into a gzip-compressed root filesystem tarball
//! that `docker import` accepts. The heavy lifting is delegated to
//! `tar`, `qemu-img`, `parted` and `mount`; this crate sequences them,
//! picks the root partition and asks the operator to confirm it.

pub mod archive;
pub mod config;
pub mod confirm;
pub mod convert;
pub mod extract;
pub mod logging;
pub mod mount;
pub mod partition;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod progress;
pub mod timing;
