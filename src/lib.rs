//! Driver for the DesignWare SSI controllers of the K210.
//!
//! Buses 0, 1 and 3 run as polling masters through [`spi_drv::Master`]. Bus 2
//! is slave-only and serves a small command protocol from interrupt context
//! through [`spi_drv::Slave`].
//!
//! Hardware access goes through the traits in [`hal`] so the board crate
//! decides how registers, pins, clocks and dma are reached.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod constants;
pub mod error;
pub mod hal;
pub mod spi_drv;
pub mod util;

#[cfg(test)]
mod testing;
