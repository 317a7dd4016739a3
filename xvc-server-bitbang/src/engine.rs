//! # Shift engine
//!
//! Turns a pair of TMS/TDI vectors into TCK pulses on the JTAG lines and captures TDO.
//!
//! Every bit takes the same three steps:
//!
//! 1. drive TMS and TDI to the bit values and TCK low, in one update
//! 2. sample TDO, which the target has updated on the previous falling edge
//! 3. raise TCK, the target registers TMS and TDI
//!
//! Before the first and after the last bit the lines rest in the idle state
//! TCK low, TMS high, TDI low.
//!
//! The per-bit steps are branch-free and statically dispatched to the [`JtagPins`]
//! adapter, so the achievable TCK frequency is bounded by the adapter's GPIO latency.
use xvc_protocol::vector_len;
use xvc_server::XvcServer;

use crate::pins::{JtagPins, Lines};

const TMS_BIT: u32 = Lines::TMS.bits().trailing_zeros();
const TDI_BIT: u32 = Lines::TDI.bits().trailing_zeros();

/// Lines high and low while no shift is running.
pub const IDLE_HIGH: Lines = Lines::TMS;
pub const IDLE_LOW: Lines = Lines::TCK.union(Lines::TDI);

/// JTAG backend that bit-bangs the JTAG lines through a [`JtagPins`] adapter.
pub struct ShiftEngine<P> {
    pins: P,
}

impl<P: JtagPins> ShiftEngine<P> {
    /// Takes ownership of the adapter and puts the lines in the idle state.
    pub fn new(pins: P) -> ShiftEngine<P> {
        let mut engine = ShiftEngine { pins };
        engine.idle();
        engine
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn into_pins(self) -> P {
        self.pins
    }

    #[inline]
    fn idle(&mut self) {
        self.pins.write(IDLE_HIGH, IDLE_LOW);
    }

    /// Shifts `num_bits` bits of `tms` and `tdi` and stores the sampled TDO bits in `tdo`.
    ///
    /// All three slices must hold `ceil(num_bits / 8)` bytes. Bits of the last TDO byte
    /// beyond `num_bits` are cleared.
    pub fn shift_bits(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8], tdo: &mut [u8]) {
        let num_bytes = vector_len(num_bits);
        debug_assert_eq!(tms.len(), num_bytes);
        debug_assert_eq!(tdi.len(), num_bytes);
        debug_assert_eq!(tdo.len(), num_bytes);

        let full_bytes = (num_bits / 8) as usize;
        let rest = num_bits % 8;

        self.idle();
        for ((tdo, &tms), &tdi) in tdo[..full_bytes]
            .iter_mut()
            .zip(&tms[..full_bytes])
            .zip(&tdi[..full_bytes])
        {
            *tdo = self.shift_byte(tms, tdi, 8);
        }
        if rest != 0 {
            tdo[full_bytes] = self.shift_byte(tms[full_bytes], tdi[full_bytes], rest);
        }
        self.idle();
    }

    /// Shifts the lowest `num_bits` bits of one vector byte, LSB first.
    #[inline(always)]
    fn shift_byte(&mut self, tms: u8, tdi: u8, num_bits: u32) -> u8 {
        let mut tdo = 0;
        for i in 0..num_bits {
            let high = Lines::from_bits_retain(
                (((tms >> i) & 1) << TMS_BIT) | (((tdi >> i) & 1) << TDI_BIT),
            );
            // TCK is always part of `low`
            self.pins.write(high, Lines::all().difference(high));
            tdo |= u8::from(self.pins.read_tdo()) << i;
            self.pins.write(Lines::TCK, Lines::empty());
        }
        tdo
    }
}

impl<P: JtagPins> XvcServer for ShiftEngine<P> {
    /// The TCK period is given by the speed of the shift loop and cannot be changed.
    /// The requested period is acknowledged unchanged.
    fn set_tck(&mut self, period_ns: u32) -> u32 {
        log::debug!("Bit-bang set_tck: period_ns={}", period_ns);
        period_ns
    }

    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8], tdo: &mut [u8]) {
        self.shift_bits(num_bits, tms, tdi, tdo);
        if let Some(err) = self.pins.take_error() {
            log::error!("GPIO error during shift of {} bits: {}", num_bits, err);
        }
    }
}
