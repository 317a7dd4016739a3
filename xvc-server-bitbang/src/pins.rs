//! # GPIO line interface
//!
//! The shift engine only talks to the JTAG lines through [`JtagPins`]. Adapters for
//! concrete GPIO hardware live in [`crate::backends`].
use std::fmt::Display;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// The JTAG lines driven by the adapter.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct Lines: u8 {
        const TCK = 1;
        const TMS = 1 << 1;
        const TDI = 1 << 2;
    }
}

/// Access to the JTAG lines of the adapter.
///
/// Both methods are called several times per shifted bit. Implementations must return
/// within a bounded time, must not block and must not allocate.
pub trait JtagPins {
    /// Drives every line in `high` high and every line in `low` low as one update.
    ///
    /// The two sets are disjoint. If the hardware cannot apply both at the same instant,
    /// `low` is applied first: the engine only ever raises TCK on its own, so clearing
    /// first keeps data lines from changing while TCK rises.
    fn write(&mut self, high: Lines, low: Lines);

    /// Samples the TDO line.
    fn read_tdo(&mut self) -> bool;

    /// Returns an error that occurred since the last call, if the adapter can fail.
    ///
    /// [`JtagPins::write`] and [`JtagPins::read_tdo`] cannot report errors without
    /// slowing down the shift loop, so adapters backed by fallible I/O remember the
    /// first failure instead.
    fn take_error(&mut self) -> Option<PinError> {
        None
    }
}

/// GPIO numbers of the JTAG signals, fixed when the server starts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinMap {
    pub tck: u32,
    pub tms: u32,
    pub tdi: u32,
    pub tdo: u32,
}

impl PinMap {
    /// Defaults of the reference board
    pub const DEFAULT: PinMap = PinMap {
        tck: 13,
        tms: 14,
        tdi: 15,
        tdo: 12,
    };

    /// GPIO numbers of the output lines, in [`Lines`] bit order.
    pub fn outputs(&self) -> [u32; 3] {
        [self.tck, self.tms, self.tdi]
    }

    /// Returns the GPIO number of every line set in `lines`.
    pub fn gpios(&self, lines: Lines) -> impl Iterator<Item = u32> + '_ {
        [Lines::TCK, Lines::TMS, Lines::TDI]
            .into_iter()
            .zip(self.outputs())
            .filter(move |(line, _)| lines.contains(*line))
            .map(|(_, gpio)| gpio)
    }

    /// Checks that no GPIO is used for two signals.
    pub fn validate(&self) -> Result<(), PinError> {
        let all = [self.tck, self.tms, self.tdi, self.tdo];
        for (i, gpio) in all.iter().enumerate() {
            if all[i + 1..].contains(gpio) {
                return Err(PinError::DuplicatePin(*gpio));
            }
        }
        Ok(())
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for PinMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TCK={} TMS={} TDI={} TDO={}",
            self.tck, self.tms, self.tdi, self.tdo
        )
    }
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error("GPIO {0} is assigned to more than one JTAG signal")]
    DuplicatePin(u32),
    #[error("GPIO {pin} is not supported, the highest usable GPIO is {max}")]
    InvalidPin { pin: u32, max: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(target_os = "linux")]
    #[error(transparent)]
    Nix(#[from] nix::Error),
    #[cfg(target_os = "linux")]
    #[error(transparent)]
    Cdev(#[from] gpiocdev::Error),
}
