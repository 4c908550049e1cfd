use clap::Parser;
use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use tracing::{info, warn};

use regdump_core::RegisterWindowSet;

/// Read raw 32-bit device registers through /dev/mem and print them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base addresses of the register blocks (hex, octal or decimal)
    #[arg(
        short = 'a',
        value_name = "ADDR",
        num_args = 1..,
        required = true,
        value_parser = parse_address
    )]
    addresses: Vec<u32>,

    /// Count of registers to read at each base address (4 bytes each)
    #[arg(short = 'c', value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,
}

/// Accepts the usual C notations: 0x-prefixed hex, 0-prefixed octal,
/// plain decimal.
fn parse_address(raw: &str) -> Result<u32, String> {
    let s = raw.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    u32::from_str_radix(digits, radix)
        .map_err(|e| format!("invalid memory address '{}': {}", raw, e))
}

/// Keep every read on the first CPU so back-to-back captures are not
/// skewed by migrations between cores.
fn pin_to_first_cpu() {
    let mut cpus = CpuSet::new();
    if let Err(err) = cpus.set(0) {
        warn!("Cannot pin to CPU 0: {}", err);
        return;
    }
    // Pid 0 targets the calling process.
    if let Err(err) = sched_setaffinity(Pid::from_raw(0), &cpus) {
        warn!("Cannot pin to CPU 0: {}", err);
    }
}

fn raise_priority() {
    // SAFETY: plain syscall, no pointers involved.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, -20) };
    if rc != 0 {
        warn!(
            "Cannot raise process priority: {}",
            std::io::Error::last_os_error()
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Register lines go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    pin_to_first_cpu();
    raise_priority();

    info!(
        "Reading {} registers at {} base address(es)",
        args.count,
        args.addresses.len()
    );

    let mut regions = RegisterWindowSet::new(&args.addresses, args.count as usize);
    regions.show_regions();

    Ok(())
}
