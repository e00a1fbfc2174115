//! Firmware core for a battery-powered load switch on the MSP430FR2x5x family.
//!
//! The device gates power to an external load, sleeps for long intervals between power cycles,
//! counts pulses on an input pin and talks to a host controller over a bit-banged two-wire
//! (I2C-style) bus.
//!
//! The core is hardware-independent: it talks to the board only through the [`embedded_hal`]
//! digital pin traits and the traits in [`hal`], so the bus engine, sleep scheduler, pulse
//! counter and command layer can all be exercised on the host with `cargo test`. Register-level
//! support for the MSP430FR2355 lives in [`board`] behind the `msp430fr2355`/`msp430fr2353`
//! features, and the flashable binary is in the `firmware/` directory.
//!
//! [`embedded_hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! # Usage
//!
//! Building the board support requires `msp430-elf-gcc` installed and in $PATH, and a nightly
//! compiler. The binary must link the `memory.x` file of the target microcontroller.
//!
//! # Features
//!
//! - `msp430fr2355`, `msp430fr2353`: enable [`board`] for that part.
//! - `defmt`: diagnostic logging through [`defmt`](https://docs.rs/defmt). Only mainline code logs.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "board", feature(asm_experimental_arch))]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod hal;
pub mod pulse;
pub mod shared;
pub mod sleep;
pub mod supervisor;

#[cfg(feature = "board")]
pub mod board;

#[cfg(feature = "board")]
pub use msp430fr2355 as pac;
