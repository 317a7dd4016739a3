//! # XVC Bit-Bang Server
//!
//! Drives a JTAG bus from XVC (Xilinx Virtual Cable) clients by toggling GPIO lines
//! in software.
//!
//! ## Overview
//!
//! The crate plugs a [`engine::ShiftEngine`] into the [`xvc_server`](https://docs.rs/xvc-server/)
//! session handling. The engine converts TMS/TDI vectors into TCK pulses through a
//! [`pins::JtagPins`] adapter, so everything timing critical happens in a single,
//! statically dispatched loop. On Linux, [`backends`] provides adapters for
//! memory-mapped GPIO registers and for the GPIO character device.
pub mod engine;
pub mod pins;

#[cfg(target_os = "linux")]
pub mod backends;
