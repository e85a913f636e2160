//! macOS module - IOKit backend for the sensor reader
//!
//! Only compiled on macOS.

pub(crate) mod iokit;
