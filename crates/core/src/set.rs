use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::window::RegisterWindow;
use crate::MEM_DEVICE;

/// The same register-count request fanned out over several base
/// addresses, one `RegisterWindow` per address, in input order.
#[derive(Debug)]
pub struct RegisterWindowSet {
    windows: Vec<RegisterWindow>,
}

impl RegisterWindowSet {
    /// Map every address in `addrs` through `/dev/mem`.
    pub fn new(addrs: &[u32], reg_count: usize) -> Self {
        Self::with_device(MEM_DEVICE, addrs, reg_count)
    }

    /// Windows are constructed in the order the addresses were given.
    /// An address that fails to map still gets a window; it stays in
    /// the set and prints zeros.
    pub fn with_device(device: impl AsRef<Path>, addrs: &[u32], reg_count: usize) -> Self {
        let device = device.as_ref();
        let windows = addrs
            .iter()
            .map(|&addr| RegisterWindow::with_device(device, addr, reg_count))
            .collect();
        Self { windows }
    }

    /// Read every window front to back. Unmapped windows are skipped
    /// over; their mapping failure was already reported when the window
    /// was built.
    pub fn read_all(&mut self) {
        for window in &mut self.windows {
            if let Err(err) = window.read_all() {
                debug!("{err}");
            }
        }
    }

    /// Write every window's snapshot lines, in set order.
    pub fn write_all<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for window in &self.windows {
            window.write_all(out)?;
        }
        Ok(())
    }

    pub fn show_all(&self) {
        let stdout = io::stdout();
        let _ = self.write_all(&mut stdout.lock());
    }

    /// Read everything first, then print everything, so slow or
    /// redirected output cannot stretch the capture window between the
    /// first and last device.
    pub fn show_regions(&mut self) {
        self.read_all();
        self.show_all();
    }

    pub fn windows(&self) -> &[RegisterWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
