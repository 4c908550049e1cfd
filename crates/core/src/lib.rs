pub mod mapping;
pub mod set;
pub mod window;


pub use set::RegisterWindowSet;
pub use window::{RegisterSnapshot, RegisterWindow};

use std::io;
use std::path::PathBuf;

/// Character device exposing physical memory to privileged processes.
pub const MEM_DEVICE: &str = "/dev/mem";

/// Byte distance between two consecutive registers.
pub const REG_STRIDE: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Cannot open {path:?}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot map {len} bytes at {addr:#010x}: {source}")]
    Mapping {
        addr: u32,
        len: usize,
        #[source]
        source: nix::Error,
    },
    #[error("Window at {0:#010x} was never mapped")]
    NotMapped(u32),
    #[error("Register count must be greater than zero")]
    InvalidRegisterCount,
    #[error("{count} registers at {addr:#010x} run past the top of the 32-bit address space")]
    SpanOverflow { addr: u32, count: usize },
    #[error("Cannot unmap {len}-byte region: {source}")]
    Release {
        len: usize,
        #[source]
        source: nix::Error,
    },
}

pub type WindowResult<T> = Result<T, WindowError>;
