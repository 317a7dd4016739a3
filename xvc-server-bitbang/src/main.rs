//! # XVC Bit-Bang Server
//!
//! Command line entry point: parses the deployment settings (address, pins, vector
//! capacity), sets up a GPIO backend and serves XVC clients one after another.
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;
use xvc_protocol::CAPACITY_BYTES;
use xvc_server::server::Builder;
use xvc_server_bitbang::pins::PinMap;

#[derive(Subcommand, Eq, PartialEq, Clone, Debug)]
enum Backend {
    /// Memory-mapped GPIO registers of a BCM283x/BCM2711 (Raspberry Pi)
    Gpiomem {
        #[arg(default_value = "/dev/gpiomem")]
        path: PathBuf,
    },
    /// Linux GPIO character device
    Cdev {
        #[arg(default_value = "/dev/gpiochip0")]
        chip: PathBuf,
    },
}

#[derive(Parser)]
#[command(about = "Xilinx Virtual Cable (XVC) server bit-banging JTAG over GPIO", long_about=None)]
struct Args {
    #[arg(short, long, default_value = "2542")]
    port: u16,

    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    #[arg(
        long,
        help = "Largest TMS/TDI vector in bytes, advertised to clients",
        default_value_t = CAPACITY_BYTES as u32,
        value_parser = vector_size
    )]
    max_vector_size: u32,

    #[arg(long, help = "Close a session after this many milliseconds without progress")]
    timeout_ms: Option<u64>,

    #[arg(long, default_value_t = PinMap::DEFAULT.tck)]
    tck: u32,

    #[arg(long, default_value_t = PinMap::DEFAULT.tms)]
    tms: u32,

    #[arg(long, default_value_t = PinMap::DEFAULT.tdi)]
    tdi: u32,

    #[arg(long, default_value_t = PinMap::DEFAULT.tdo)]
    tdo: u32,

    #[arg(long, help = "Pin the server to one CPU to reduce TCK jitter")]
    cpu: Option<usize>,

    #[arg(
        long,
        help = "Run with this SCHED_FIFO real-time priority (1-99)",
        value_parser = rt_priority
    )]
    rt_priority: Option<i32>,

    #[clap(subcommand)]
    backend: Option<Backend>,
}

fn vector_size(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 1 << 20)
}

fn rt_priority(s: &str) -> Result<i32, String> {
    clap_num::number_range(s, 1, 99)
}

/// Prefers the memory-mapped registers when the board provides them
fn detect_backend() -> Backend {
    let gpiomem = PathBuf::from("/dev/gpiomem");
    if gpiomem.exists() {
        log::info!("Auto-detected GPIO memory at {}", gpiomem.display());
        Backend::Gpiomem { path: gpiomem }
    } else {
        Backend::Cdev {
            chip: PathBuf::from("/dev/gpiochip0"),
        }
    }
}

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> nix::Result<()> {
    use nix::{
        sched::{CpuSet, sched_setaffinity},
        unistd::Pid,
    };

    let mut cpus = CpuSet::new();
    cpus.set(cpu)?;
    sched_setaffinity(Pid::from_raw(0), &cpus)
}

/// Moves the calling process into the `SCHED_FIFO` class so that shifts are not
/// preempted by ordinary tasks.
#[cfg(target_os = "linux")]
fn set_rt_priority(priority: i32) -> std::io::Result<()> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid `sched_param` for the duration of the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
fn run(
    args: Args,
    pins: PinMap,
    builder: Builder,
    addr: SocketAddr,
) -> Result<(), Box<dyn Error>> {
    use xvc_server_bitbang::{
        backends::{cdev::CdevPins, gpiomem::GpioMemPins},
        engine::ShiftEngine,
    };

    if let Some(cpu) = args.cpu {
        pin_to_cpu(cpu)?;
        log::info!("Pinned server to CPU {}", cpu);
    }
    if let Some(priority) = args.rt_priority {
        set_rt_priority(priority)?;
        log::info!("Running with real-time priority {}", priority);
    }

    match args.backend.unwrap_or_else(detect_backend) {
        Backend::Gpiomem { path } => {
            log::info!("Initializing GPIO memory backend from {}", path.display());
            let engine = ShiftEngine::new(GpioMemPins::new(&path, pins)?);
            builder.build(engine).listen(addr)?;
        }
        Backend::Cdev { chip } => {
            log::info!("Initializing GPIO character device backend from {}", chip.display());
            let engine = ShiftEngine::new(CdevPins::new(&chip, pins)?);
            builder.build(engine).listen(addr)?;
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(
    args: Args,
    _pins: PinMap,
    _builder: Builder,
    _addr: SocketAddr,
) -> Result<(), Box<dyn Error>> {
    let backend = args.backend.unwrap_or_else(detect_backend);
    Err(format!("{:?} requires Linux GPIO support", backend).into())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("Starting XVC bit-bang server");

    let args = Args::parse();
    log::debug!("Parsed arguments: ip={}, port={}", args.ip, args.port);

    let pins = PinMap {
        tck: args.tck,
        tms: args.tms,
        tdi: args.tdi,
        tdo: args.tdo,
    };
    pins.validate()?;
    log::info!("JTAG pins: {}", pins);

    let mut builder = Builder::new().max_vector_size(args.max_vector_size);
    if let Some(timeout_ms) = args.timeout_ms {
        builder = builder.rw_timeout(Duration::from_millis(timeout_ms));
    }
    log::debug!("Server config: max_vector_size={}", args.max_vector_size);

    let addr = SocketAddr::new(args.ip, args.port);
    log::info!("Binding to address: {}", addr);
    run(args, pins, builder, addr)
}
