//! Test harness: a loopback JTAG adapter and an XVC server running on a background thread.
use std::{
    net::{SocketAddr, TcpListener},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread,
};

use xvc_server::server::{Config, Server};
use xvc_server_bitbang::{
    engine::ShiftEngine,
    pins::{JtagPins, Lines},
};

/// Adapter whose TDO input is wired to its own TDI output.
///
/// TDO is sampled while TCK is low, right after TDI was driven for the same bit, so a
/// shift returns its TDI vector (with the bits past the bit count cleared).
/// Clones share their line levels, which lets tests observe the bus of a running server.
#[derive(Clone, Default)]
pub struct LoopbackPins {
    levels: Arc<AtomicU8>,
}

impl LoopbackPins {
    pub fn levels(&self) -> Lines {
        Lines::from_bits_retain(self.levels.load(Ordering::Acquire))
    }
}

impl JtagPins for LoopbackPins {
    fn write(&mut self, high: Lines, low: Lines) {
        let levels = self.levels.load(Ordering::Relaxed);
        self.levels
            .store((levels | high.bits()) & !low.bits(), Ordering::Release);
    }

    fn read_tdo(&mut self) -> bool {
        self.levels().contains(Lines::TDI)
    }
}

/// A server on an ephemeral localhost port
pub struct TestServer {
    pub addr: SocketAddr,
    pub pins: LoopbackPins,
}

pub fn spawn_server(config: Config) -> TestServer {
    let _ = env_logger::builder().is_test(true).try_init();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Binding to localhost should work");
    let addr = listener.local_addr().expect("Listener has an address");
    let pins = LoopbackPins::default();
    let mut server = Server::new(ShiftEngine::new(pins.clone()), config);
    thread::spawn(move || server.serve(listener));
    TestServer { addr, pins }
}
