//! lmu: ambient light sensor reader for Apple laptops
//!
//! ```no_run
//! let raw = lmu::sensors::ambient_light::read_ambient_light()?;
//! println!("{}", raw);
//! # Ok::<(), lmu::sensors::ambient_light::LmuError>(())
//! ```

pub mod config;

pub mod sensors;

#[cfg(target_os = "macos")]
mod macos;

pub mod shared;
