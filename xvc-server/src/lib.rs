//! # XVC Server Library
//!
//! This crate provides a foundation for implementing Xilinx Virtual Cable (XVC) servers
//! that handle JTAG communication with FPGA devices over network connections.
//!
//! ## Overview
//!
//! XVC is a protocol used by Xilinx design tools to interact with FPGA devices remotely.
//! This library abstracts the protocol handling and provides a server implementation that
//! can work with different JTAG backends.
//!
//! ## Architecture
//!
//! The crate is built around three components:
//!
//! - **[`XvcServer`] Trait**: Defines the interface that backends must implement
//!   to handle low-level JTAG operations (TCK configuration and vector shifting)
//! - **[`session::Session`]**: Runs the XVC command loop for one client connection,
//!   owning the vector buffers used by every shift
//! - **[`server::Server`]**: Accepts clients one after another and hands each of them
//!   to a session
//!
//! ## How It Works
//!
//! 1. A backend (e.g. a GPIO bit-bang engine) implements the [`XvcServer`] trait
//! 2. The backend is wrapped in a [`server::Server`] instance
//! 3. The server accepts a single TCP connection and processes XVC protocol messages
//! 4. Each message is dispatched to the backend for actual JTAG operations
//! 5. Results are sent back to the client, then the next message is read
//! 6. When the client leaves or misbehaves the connection is closed and the next client is accepted
//!
//! ## Protocol Support
//!
//! This implementation supports the XVC 1.0 protocol with the following operations:
//!
//! - **GetInfo**: Query server capabilities (version, max vector size)
//! - **SetTck**: Configure the JTAG Test Clock (TCK) period
//! - **Shift**: Perform JTAG vector shifting (TMS/TDI/TDO)
//!
//! For detailed protocol information, see the [`xvc_protocol`](https://docs.rs/xvc-protocol/) crate.
//!
//! ## Basic Usage
//!
//! ### Implementing a Backend
//!
//! ```ignore
//! use xvc_server::XvcServer;
//!
//! struct MyDriver {
//!     // device-specific fields
//! }
//!
//! impl XvcServer for MyDriver {
//!     fn set_tck(&mut self, period_ns: u32) -> u32 {
//!         // Configure hardware TCK period
//!         period_ns
//!     }
//!
//!     fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8], tdo: &mut [u8]) {
//!         // Perform JTAG shifting and fill in TDO data
//!     }
//! }
//! ```
//!
//! ### Starting the Server
//!
//! ```ignore
//! use xvc_server::server::Builder;
//!
//! let mut server = Builder::new().max_vector_size(2048).build(MyDriver::new()?);
//! server.listen("0.0.0.0:2542")?;
//! ```
//!
//! ## Error Handling
//!
//! The XVC 1.0 protocol has no error response. Every failure while serving a client,
//! see [`error::SessionError`], is logged and ends that client's connection. The server
//! itself keeps accepting new clients.
//!
//! ## Configuration
//!
//! Server behavior can be customized via [`server::Config`]:
//!
//! - **max_vector_size**: Maximum size of JTAG vectors in bytes (default: 2048)
//! - **read_write_timeout**: Optional socket I/O timeout (default: none)
//! - **nodelay**: Disable Nagle's algorithm on accepted sockets (default: true)
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Client connections and disconnections
//! - Protocol messages being processed
//! - Vector contents at `trace` level
//!
//! ## Thread Model
//!
//! The server processes each client connection sequentially in the calling thread.
//! The JTAG bus is a single physical resource, so there is no multi-client mode.
pub mod error;
pub mod server;
pub mod session;

/// Trait that JTAG backends must implement.
///
/// This trait defines the interface between the XVC protocol server and the hardware that
/// drives the JTAG lines. Methods take `&mut self`: a backend is used by exactly one
/// session at a time.
pub trait XvcServer {
    /// Set the TCK (Test Clock) period.
    ///
    /// # Returns
    ///
    /// The TCK period in nanoseconds that the backend reports back to the client.
    fn set_tck(&mut self, period_ns: u32) -> u32;

    /// Shift JTAG TMS and TDI vectors into the device and capture TDO.
    ///
    /// `tms`, `tdi` and `tdo` are all exactly ⌈num_bits / 8⌉ bytes long and use the XVC
    /// bit order: bit `i` lives in byte `i / 8` at position `i % 8`.
    /// The session has validated the sizes against its capacity before calling.
    ///
    /// The XVC 1.0 protocol does not support error reporting for shift operations,
    /// and a started shift always runs to completion.
    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8], tdo: &mut [u8]);
}
