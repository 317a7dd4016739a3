//! Serving requests must not touch the heap once a session is set up.
use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    io::{self, Read, Write},
    sync::atomic::{AtomicUsize, Ordering},
};

use xvc_server::{XvcServer, session::Session};

struct CountingAllocator;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNTING.with(Cell::get) {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        // SAFETY: forwarded unchanged to the system allocator
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was returned by `System.alloc` with the same layout
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

/// Counts heap allocations made by the current thread while running `f`.
fn allocations<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let before = ALLOCATIONS.load(Ordering::Relaxed);
    COUNTING.with(|counting| counting.set(true));
    let result = f();
    COUNTING.with(|counting| counting.set(false));
    (result, ALLOCATIONS.load(Ordering::Relaxed) - before)
}

/// Client side of the connection: replays a request stream, discards the responses.
struct Wire<'a> {
    input: &'a [u8],
    received: usize,
}

impl Read for Wire<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Wire<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.received += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Loopback;

impl XvcServer for Loopback {
    fn set_tck(&mut self, period_ns: u32) -> u32 {
        period_ns
    }

    fn shift(&mut self, _num_bits: u32, _tms: &[u8], tdi: &[u8], tdo: &mut [u8]) {
        tdo.copy_from_slice(tdi);
    }
}

/// `rounds` repetitions of one `getinfo:`, `settck:` and 13 bit `shift:` request
fn requests(rounds: usize) -> Vec<u8> {
    let mut input = Vec::new();
    for _ in 0..rounds {
        input.extend_from_slice(b"getinfo:");
        input.extend_from_slice(b"settck:\x0a\x00\x00\x00");
        input.extend_from_slice(b"shift:\x0d\x00\x00\x00\x1f\x00\xAA\x15");
    }
    input
}

/// Runs a whole session over `input`, returning the response byte count.
fn serve(input: &[u8]) -> usize {
    let mut session = Session::new(
        Wire {
            input,
            received: 0,
        },
        2048,
    );
    session
        .run(&mut Loopback)
        .expect("Session should end with the client disconnecting");
    session.into_inner().received
}

#[test]
fn requests_do_not_allocate() {
    // one response round: info line, period, two TDO bytes
    let round = b"xvcServer_v1.0:2048\n".len() + 4 + 2;

    let single = requests(1);
    let many = requests(100);
    let (received_single, single_allocations) = allocations(|| serve(&single));
    let (received_many, many_allocations) = allocations(|| serve(&many));

    assert_eq!(received_single, round);
    assert_eq!(received_many, 100 * round);
    // Only session setup and teardown may allocate, independent of the request count.
    assert_eq!(single_allocations, many_allocations);
}
