//! # XVC Client
//!
//! A blocking client for Xilinx Virtual Cable (XVC) servers, performing remote JTAG
//! operations over TCP.
//!
//! ## Overview
//!
//! The client sends one request at a time and waits for the matching response, as the
//! XVC 1.0 protocol requires. It is used to drive XVC servers from tools and tests.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use xvc_client::XvcClient;
//!
//! let mut client = XvcClient::new("127.0.0.1:2542")?;
//!
//! // Query server capabilities
//! let info = client.get_info()?;
//! println!("Server version: {}", info.version());
//! println!("Max vector size: {} bytes", info.max_vector_len());
//!
//! // TCK period in nanoseconds, the server answers with the period it applied
//! let actual_period = client.set_tck(100)?;
//!
//! // Shift 8 bits: TMS stays low, TDI carries 0xA5
//! let tdo = client.shift(8, &[0x00], &[0xA5])?;
//! ```
//!
//! ## Related Crates
//!
//! - [`xvc_server`](https://docs.rs/xvc-server/) - Server implementation
//! - [`xvc_protocol`](https://docs.rs/xvc-protocol/) - Protocol encoding/decoding
use std::{
    io::{self, ErrorKind},
    net::{TcpStream, ToSocketAddrs},
};

use xvc_protocol::{Message, XvcInfo, codec::read_frame, error::ReadError, vector_len};

/// XVC client for remote JTAG operations.
///
/// Connects to an XVC server and provides methods for JTAG operations.
pub struct XvcClient {
    tcp: TcpStream,
}

impl XvcClient {
    /// Connects to `addr`. Nagle's algorithm is disabled, requests are small and
    /// strictly alternate with responses.
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<XvcClient> {
        let tcp = TcpStream::connect(addr)?;
        tcp.set_nodelay(true)?;
        log::debug!("Connected to XVC server at {}", tcp.peer_addr()?);
        Ok(XvcClient { tcp })
    }

    /// Query server capabilities and version information.
    pub fn get_info(&mut self) -> Result<XvcInfo, ReadError> {
        Message::GetInfo.write_to(&mut self.tcp)?;
        XvcInfo::from_reader(&mut self.tcp)
    }

    /// Set the JTAG Test Clock (TCK) period.
    /// # Returns
    ///
    /// The actual TCK period set by the server.
    // May differ from requested, if the server does not support the requested rate.
    pub fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        Message::SetTck { period_ns }.write_to(&mut self.tcp)?;
        let mut buf = [0u8; 4];
        read_frame(&mut self.tcp, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Perform a JTAG shift operation.
    ///
    /// # Arguments
    ///
    /// * `num_bits` - Number of bits to shift
    /// * `tms` - Test Mode Select vector (length must be ⌈num_bits / 8⌉)
    /// * `tdi` - Test Data In vector (length must be ⌈num_bits / 8⌉)
    ///
    /// # Returns
    ///
    /// Test Data Out vector from the JTAG chain of the same length as `tms` and `tdi`.
    /// Vectors of the wrong length are rejected before anything is sent.
    pub fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        let num_bytes = vector_len(num_bits);
        if tms.len() != num_bytes || tdi.len() != num_bytes {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "{} bits need {} byte vectors, got TMS={} TDI={}",
                    num_bits,
                    num_bytes,
                    tms.len(),
                    tdi.len()
                ),
            ));
        }
        Message::Shift {
            num_bits,
            tms: tms.into(),
            tdi: tdi.into(),
        }
        .write_to(&mut self.tcp)?;
        let mut buf = vec![0; num_bytes];
        read_frame(&mut self.tcp, &mut buf)?;
        Ok(buf.into_boxed_slice())
    }
}
