//! # Memory-mapped GPIO Backend
//!
//! For BCM283x and BCM2711 based boards (Raspberry Pi) that expose the GPIO register
//! block through `/dev/gpiomem`.
//!
//! The block has dedicated write-1-to-set and write-1-to-clear registers, so any
//! combination of lines changes with a single store per direction and without a
//! read-modify-write cycle.
//!
//! ## Example Usage
//!
//! ```ignore
//! use xvc_server_bitbang::{backends::gpiomem::GpioMemPins, engine::ShiftEngine, pins::PinMap};
//! use xvc_server::server::Builder;
//!
//! let pins = GpioMemPins::new("/dev/gpiomem", PinMap::DEFAULT)?;
//! let mut server = Builder::new().build(ShiftEngine::new(pins));
//! server.listen("0.0.0.0:2542")?;
//! ```
use std::{
    fs::OpenOptions,
    num::NonZeroUsize,
    path::Path,
    ptr::{NonNull, read_volatile, write_volatile},
    thread,
    time::Duration,
};

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};

use crate::pins::{JtagPins, Lines, PinError, PinMap};

// Word offsets into the register block
const GPFSEL0: usize = 0x00 / 4;
const GPSET0: usize = 0x1C / 4;
const GPCLR0: usize = 0x28 / 4;
const GPLEV0: usize = 0x34 / 4;
// BCM283x pull control
const GPPUD: usize = 0x94 / 4;
const GPPUDCLK0: usize = 0x98 / 4;
// BCM2711 pull control, 2 bits per pin
const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4 / 4;
const GPIO_PUP_PDN_CNTRL_REG3: usize = 0xF0 / 4;

const FSEL_INPUT: u32 = 0b000;
const FSEL_OUTPUT: u32 = 0b001;
const FSEL_MASK: u32 = 0b111;

const GPPUD_PULL_UP: u32 = 0b10;
const PUP_PDN_PULL_UP: u32 = 0b01;
const PUP_PDN_MASK: u32 = 0b11;
/// What the BCM283x returns for the pull registers it does not have ("gpio")
const NO_PUP_PDN_REGS: u32 = 0x6770_696f;
/// The BCM283x needs 150 core cycles between the steps of the pull sequence.
const GPPUD_SETUP: Duration = Duration::from_micros(5);

/// Only bank 0 is used so that every access is a single register.
const MAX_GPIO: u32 = 31;

const MAP_SIZE: NonZeroUsize = NonZeroUsize::new(0x1000).expect("map size is not zero");

/// Register mask of every combination of output lines, indexed by [`Lines::bits`].
fn line_masks(pins: &PinMap) -> [u32; 8] {
    let mut masks = [0u32; 8];
    for (bits, mask) in masks.iter_mut().enumerate() {
        let lines = Lines::from_bits_retain(bits as u8);
        *mask = pins.gpios(lines).fold(0, |mask, gpio| mask | (1 << gpio));
    }
    masks
}

/// Word-addressed view of the GPIO register block.
#[derive(Copy, Clone)]
struct Registers {
    base: NonNull<u32>,
}

impl Registers {
    /// # Safety
    ///
    /// `base` must point to [`MAP_SIZE`] bytes of readable and writable memory that
    /// stay valid for as long as the returned value is used.
    unsafe fn from_raw(base: NonNull<u32>) -> Registers {
        Registers { base }
    }

    #[inline(always)]
    fn read(self, word: usize) -> u32 {
        debug_assert!(word < MAP_SIZE.get() / 4);
        // SAFETY: `word` lies within the block promised to `from_raw`.
        unsafe { read_volatile(self.base.as_ptr().add(word)) }
    }

    #[inline(always)]
    fn write(self, word: usize, value: u32) {
        debug_assert!(word < MAP_SIZE.get() / 4);
        // SAFETY: `word` lies within the block promised to `from_raw`.
        unsafe { write_volatile(self.base.as_ptr().add(word), value) }
    }

    fn set_function(self, pin: u32, function: u32) {
        let reg = GPFSEL0 + (pin / 10) as usize;
        let shift = (pin % 10) * 3;
        let value = self.read(reg);
        self.write(reg, (value & !(FSEL_MASK << shift)) | (function << shift));
    }

    /// The BCM2711 has per-pin pull control registers, older chips read them as "gpio".
    fn has_pup_pdn_regs(self) -> bool {
        self.read(GPIO_PUP_PDN_CNTRL_REG3) != NO_PUP_PDN_REGS
    }

    fn set_pull_up(self, pin: u32) {
        if self.has_pup_pdn_regs() {
            let reg = GPIO_PUP_PDN_CNTRL_REG0 + (pin / 16) as usize;
            let shift = (pin % 16) * 2;
            let value = self.read(reg);
            self.write(reg, (value & !(PUP_PDN_MASK << shift)) | (PUP_PDN_PULL_UP << shift));
        } else {
            self.write(GPPUD, GPPUD_PULL_UP);
            thread::sleep(GPPUD_SETUP);
            self.write(GPPUDCLK0, 1 << pin);
            thread::sleep(GPPUD_SETUP);
            self.write(GPPUD, 0);
            self.write(GPPUDCLK0, 0);
        }
    }
}

/// JTAG lines on the memory-mapped GPIO block of a BCM283x/BCM2711.
pub struct GpioMemPins {
    regs: Registers,
    /// Register mask for every combination of [`Lines`], indexed by its bits
    masks: [u32; 8],
    tdo_mask: u32,
}

impl GpioMemPins {
    /// Maps the GPIO block, configures the pin directions and sets the lines idle.
    pub fn new(path: impl AsRef<Path>, pins: PinMap) -> Result<GpioMemPins, PinError> {
        pins.validate()?;
        for pin in pins.outputs().into_iter().chain([pins.tdo]) {
            if pin > MAX_GPIO {
                return Err(PinError::InvalidPin { pin, max: MAX_GPIO });
            }
        }

        let device_path = path.as_ref();
        log::debug!("Opening GPIO memory device: {}", device_path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device_path)?;

        // SAFETY: The mapping is private to this struct and unmapped on drop.
        let regs = unsafe {
            log::debug!("Mapping GPIO registers (size=0x{:x})", MAP_SIZE.get());
            let ptr = mmap(
                None,
                MAP_SIZE,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )?;
            Registers::from_raw(ptr.cast())
        };

        let mut gpio = GpioMemPins {
            regs,
            masks: line_masks(&pins),
            tdo_mask: 1 << pins.tdo,
        };
        gpio.configure(&pins);
        log::info!("GPIO registers mapped, pins {}", pins);

        Ok(gpio)
    }

    fn configure(&mut self, pins: &PinMap) {
        // Outputs start idle so that configuring the direction causes no TCK edge.
        self.write(Lines::TMS, Lines::TCK | Lines::TDI);
        for pin in pins.outputs() {
            self.regs.set_function(pin, FSEL_OUTPUT);
        }
        self.regs.set_function(pins.tdo, FSEL_INPUT);
        // An undriven TDO reads as 1
        self.regs.set_pull_up(pins.tdo);
    }
}

impl JtagPins for GpioMemPins {
    #[inline(always)]
    fn write(&mut self, high: Lines, low: Lines) {
        let set = self.masks[usize::from(high.bits() & 0b111)];
        let clear = self.masks[usize::from(low.bits() & 0b111)];
        self.regs.write(GPCLR0, clear);
        self.regs.write(GPSET0, set);
    }

    #[inline(always)]
    fn read_tdo(&mut self) -> bool {
        self.regs.read(GPLEV0) & self.tdo_mask != 0
    }
}

impl Drop for GpioMemPins {
    fn drop(&mut self) {
        // SAFETY: `regs` was mapped with `MAP_SIZE` in `new` and is not used afterwards.
        unsafe {
            let _ = munmap(self.regs.base.cast(), MAP_SIZE.get());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// A register block in plain memory
    fn block() -> Vec<u32> {
        vec![0; MAP_SIZE.get() / 4]
    }

    fn regs(block: &mut [u32]) -> Registers {
        assert_eq!(block.len(), MAP_SIZE.get() / 4);
        // SAFETY: the block covers the whole register map and outlives every use.
        unsafe { Registers::from_raw(NonNull::from(block).cast()) }
    }

    #[test]
    fn masks_cover_every_line_combination() {
        let masks = line_masks(&PinMap::DEFAULT);
        assert_eq!(masks[0], 0);
        assert_eq!(masks[Lines::TCK.bits() as usize], 1 << 13);
        assert_eq!(masks[Lines::TMS.bits() as usize], 1 << 14);
        assert_eq!(masks[Lines::TDI.bits() as usize], 1 << 15);
        assert_eq!(
            masks[(Lines::TCK | Lines::TDI).bits() as usize],
            (1 << 13) | (1 << 15)
        );
        assert_eq!(masks[Lines::all().bits() as usize], 0b111 << 13);
    }

    #[test]
    fn function_select_only_touches_its_pin() {
        let mut block = block();
        block[GPFSEL0 + 1] = u32::MAX;
        regs(&mut block).set_function(13, FSEL_OUTPUT);
        assert_eq!(block[GPFSEL0 + 1], !(0b110 << 9));
    }

    #[test]
    fn bcm2711_pull_up_uses_pin_bits() {
        let mut block = block();
        block[GPIO_PUP_PDN_CNTRL_REG0] = u32::MAX;
        block[GPIO_PUP_PDN_CNTRL_REG0 + 1] = 0;
        let regs = regs(&mut block);
        assert!(regs.has_pup_pdn_regs());
        regs.set_pull_up(12);
        regs.set_pull_up(17);
        assert_eq!(block[GPIO_PUP_PDN_CNTRL_REG0], !(0b10 << 24));
        assert_eq!(block[GPIO_PUP_PDN_CNTRL_REG0 + 1], 0b01 << 2);
    }

    #[test]
    fn bcm283x_pull_up_releases_the_clock() {
        let mut block = block();
        block[GPIO_PUP_PDN_CNTRL_REG3] = NO_PUP_PDN_REGS;
        block[GPIO_PUP_PDN_CNTRL_REG0] = NO_PUP_PDN_REGS;
        let regs = regs(&mut block);
        assert!(!regs.has_pup_pdn_regs());
        regs.set_pull_up(12);
        assert_eq!(block[GPPUD], 0);
        assert_eq!(block[GPPUDCLK0], 0);
        assert_eq!(block[GPIO_PUP_PDN_CNTRL_REG0], NO_PUP_PDN_REGS);
    }
}
