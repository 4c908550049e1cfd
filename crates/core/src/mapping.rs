use std::ffi::c_void;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::{self, NonNull};

use nix::libc;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::unistd::{sysconf, SysconfVar};
use tracing::warn;

use crate::{WindowError, WindowResult};

/// Memory-mapping granularity of the running kernel.
pub fn page_size() -> usize {
    sysconf(SysconfVar::PAGE_SIZE)
        .ok()
        .flatten()
        .map(|v| v as usize)
        .unwrap_or(4096)
}

/// One page-aligned `MAP_SHARED` view of the physical-memory device.
///
/// Owns both the device handle and the mapping; both are released when
/// the value is dropped. The mapping starts at `base_addr` rounded down
/// to a page boundary and covers at least `span` bytes past `base_addr`.
#[derive(Debug)]
pub struct RegionMapping {
    base: NonNull<c_void>,
    len: usize,
    page_offset: usize,
    _device: File,
}

impl RegionMapping {
    /// Open `device` and map `span` bytes of it starting at `base_addr`.
    ///
    /// `span` must be non-zero; the caller validates the register count.
    pub fn map(device: &Path, base_addr: u32, span: usize) -> WindowResult<Self> {
        let device_file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(|source| WindowError::DeviceOpen {
                path: device.to_path_buf(),
                source,
            })?;

        let page = page_size();
        let page_offset = base_addr as usize & (page - 1);
        let len = (page_offset + span).next_multiple_of(page);
        let Some(map_len) = NonZeroUsize::new(len) else {
            return Err(WindowError::InvalidRegisterCount);
        };

        // SAFETY: mapping fresh pages chosen by the kernel; nothing in
        // this address range is in use by the process yet.
        let base = unsafe {
            mmap(
                None,
                map_len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &device_file,
                (base_addr as usize - page_offset) as libc::off_t,
            )
        }
        .map_err(|source| WindowError::Mapping {
            addr: base_addr,
            len,
            source,
        })?;

        Ok(Self {
            base,
            len,
            page_offset,
            _device: device_file,
        })
    }

    /// Single volatile 32-bit load at `offset` bytes past the requested
    /// base address.
    pub fn read_u32(&self, offset: usize) -> u32 {
        debug_assert!(self.page_offset + offset + 4 <= self.len);
        // SAFETY: the mapping covers page_offset + span bytes and stays
        // alive for &self; offsets past that are rejected above.
        unsafe {
            let p = self.base.as_ptr().cast::<u8>().add(self.page_offset + offset);
            ptr::read_volatile(p.cast::<u32>())
        }
    }
}

impl Drop for RegionMapping {
    fn drop(&mut self) {
        // SAFETY: base/len are the exact values returned by mmap and the
        // mapping has not been released elsewhere.
        if let Err(source) = unsafe { munmap(self.base, self.len) } {
            warn!(
                "{}",
                WindowError::Release {
                    len: self.len,
                    source,
                }
            );
        }
        // The device handle is closed by File's drop afterwards.
    }
}
