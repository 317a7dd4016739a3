//! # XVC Protocol Library
//!
//! This crate provides a Rust implementation of the [Xilinx Virtual Cable (XVC)](https://github.com/Xilinx/XilinxVirtualCable) protocol,
//! enabling client-server communication for JTAG vector shifting and cable configuration.
//!
//! ## Overview
//!
//! XVC is a protocol used by Xilinx design tools to interact with FPGA devices over a network connection.
//! This library implements the protocol specification, allowing you to:
//!
//! - Decode XVC commands on the server side without allocating
//! - Serialize XVC messages on the client side
//! - Exchange the server capability line
//!
//! ## Protocol Features
//!
//! - **Protocol Versions**: XVC 1.0
//! - **Message Types**:
//!   - `GetInfo`: Query server capabilities (protocol version, max vector length)
//!   - `SetTck`: Configure the TCK clock period in nanoseconds
//!   - `Shift`: Shift JTAG TMS/TDI vectors into a device
//!
//! ## Basic Usage
//!
//! ### Decoding Commands
//!
//! Commands are decoded into caller-owned vector buffers. The length of the buffers
//! bounds the largest accepted shift.
//!
//! ```
//! use xvc_protocol::{CAPACITY_BYTES, Command};
//! use std::io::Cursor;
//!
//! let mut tms = vec![0; CAPACITY_BYTES];
//! let mut tdi = vec![0; CAPACITY_BYTES];
//! let mut reader = Cursor::new(b"shift:\x04\x00\x00\x00\x03\x0a".to_vec());
//! let cmd = Command::from_reader(&mut reader, &mut tms, &mut tdi).expect("Command should parse");
//! assert_eq!(cmd, Command::Shift { num_bits: 4, tms: &[0x03], tdi: &[0x0a] });
//! ```
//!
//! ### Reading Server Capabilities
//!
//! ```
//! use xvc_protocol::{XvcInfo, Version};
//! use std::io::Cursor;
//!
//! let server_response = b"xvcServer_v1.0:32\n";
//! let mut reader = Cursor::new(server_response);
//! let info = XvcInfo::from_reader(&mut reader).expect("Info should parse");
//! assert_eq!(info.version(), Version::V1_0);
//! assert_eq!(info.max_vector_len(), 32);
//! ```
//!
//! ### Writing Messages to a Server
//!
//! ```
//! use xvc_protocol::Message;
//!
//! let num_bytes = 2;
//! let tms = vec![0xAA; num_bytes].into_boxed_slice();
//! let tdi = vec![0x55; num_bytes].into_boxed_slice();
//!
//! let shift_msg = Message::Shift { num_bits: 8 * num_bytes as u32, tms, tdi };
//! let mut output = Vec::new();
//! shift_msg.write_to(&mut output).expect("Writing to vector shouldn't fail");
//! assert_eq!(output, b"shift:\x10\x00\x00\x00\xAA\xAA\x55\x55");
//! ```
//!
//! ## Message Format
//!
//! All messages use a binary protocol with the following structure:
//!
//! - **GetInfo**: `getinfo:`
//! - **SetTck**: `settck:<period in ns: u32>`
//! - **Shift**: `shift:<num_bits: u32><TMS vector><TDI vector>`
//! - **XvcInfo**: `xvcServer_v{version}:<max_vector_len: u32>\n`
//!
//! Integers are little-endian. Vectors hold `ceil(num_bits / 8)` bytes; bit `i` is
//! stored in byte `i / 8` at position `i % 8`, least significant bit first.
//! Only the first two bytes of a command select it, there is no length envelope.
//!
//! ## Error Handling
//!
//! This library uses the [`error::ReadError`] type for protocol parsing errors.
//! [`codec::read_frame`] is the building block for every fixed-size read.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
