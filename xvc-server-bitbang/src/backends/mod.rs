//! GPIO adapters implementing [`crate::pins::JtagPins`].
//!
//! - [`gpiomem`]: memory-mapped BCM283x/BCM2711 GPIO registers, the fast path
//! - [`cdev`]: any GPIO controller through the Linux GPIO character device
pub mod cdev;
pub mod gpiomem;
