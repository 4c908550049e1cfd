use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::mapping::{page_size, RegionMapping};
use crate::{WindowError, WindowResult, MEM_DEVICE, REG_STRIDE};

/// One captured register: where it lives and what it held at the last
/// read. Values start at zero until the first successful `read_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub addr: u32,
    pub value: u32,
}

/// A mapped view over one contiguous run of 32-bit device registers.
///
/// The mapping is attempted once, at construction. A window whose
/// mapping failed stays around as an inert shell: it still knows its
/// register addresses and reports zero values, and every `read_all`
/// fails with `NotMapped`.
#[derive(Debug)]
pub struct RegisterWindow {
    base_addr: u32,
    page_offset: usize,
    snapshots: Vec<RegisterSnapshot>,
    mapping: Option<RegionMapping>,
}

impl RegisterWindow {
    /// Map `reg_count` registers at `base_addr` through `/dev/mem`.
    pub fn new(base_addr: u32, reg_count: usize) -> Self {
        Self::with_device(MEM_DEVICE, base_addr, reg_count)
    }

    /// Same engine over an arbitrary backing path. A regular file works
    /// exactly like the memory device under mmap, with file offsets
    /// standing in for physical addresses.
    pub fn with_device(device: impl AsRef<Path>, base_addr: u32, reg_count: usize) -> Self {
        let page_offset = base_addr as usize & (page_size() - 1);

        if reg_count == 0 {
            warn!("{}", WindowError::InvalidRegisterCount);
            return Self {
                base_addr,
                page_offset,
                snapshots: Vec::new(),
                mapping: None,
            };
        }

        // Addresses are fixed for the life of the window; fill them in
        // up front so they exist even when the mapping fails.
        let snapshots = (0..reg_count)
            .map(|i| RegisterSnapshot {
                addr: base_addr.wrapping_add((i * REG_STRIDE) as u32),
                value: 0,
            })
            .collect();

        let mapping = match Self::try_map(device.as_ref(), base_addr, reg_count) {
            Ok(mapping) => Some(mapping),
            Err(err) => {
                warn!("{err}");
                None
            }
        };

        Self {
            base_addr,
            page_offset,
            snapshots,
            mapping,
        }
    }

    fn try_map(device: &Path, base_addr: u32, reg_count: usize) -> WindowResult<RegionMapping> {
        let span = reg_count * REG_STRIDE;
        if base_addr as u64 + span as u64 > u32::MAX as u64 + 1 {
            return Err(WindowError::SpanOverflow {
                addr: base_addr,
                count: reg_count,
            });
        }
        RegionMapping::map(device, base_addr, span)
    }

    pub fn base_addr(&self) -> u32 {
        self.base_addr
    }

    pub fn reg_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Byte offset of the base address within its page, always below
    /// the page size.
    pub fn page_offset(&self) -> usize {
        self.page_offset
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn snapshots(&self) -> &[RegisterSnapshot] {
        &self.snapshots
    }

    /// Capture every register, in ascending address order.
    ///
    /// Each entry is one volatile 32-bit load. Registers are not read
    /// atomically as a group; hardware mutating the block mid-call can
    /// leave a torn set in the snapshots.
    pub fn read_all(&mut self) -> WindowResult<()> {
        let Some(mapping) = self.mapping.as_ref() else {
            return Err(WindowError::NotMapped(self.base_addr));
        };

        for (i, slot) in self.snapshots.iter_mut().enumerate() {
            slot.value = mapping.read_u32(i * REG_STRIDE);
        }

        Ok(())
    }

    /// Write one `address - value` line per snapshot, in stored order.
    pub fn write_all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for snap in &self.snapshots {
            writeln!(out, "0x{:08X} - 0x{:08X}", snap.addr, snap.value)?;
        }
        Ok(())
    }

    /// Print the snapshots to stdout. Output trouble is ignored; the
    /// snapshots themselves are never affected.
    pub fn show_all(&self) {
        let stdout = io::stdout();
        let _ = self.write_all(&mut stdout.lock());
    }
}
