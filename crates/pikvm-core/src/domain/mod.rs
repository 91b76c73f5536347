//! Domain layer: pure types with no I/O.
//!
//! - [`config`] – how to reach a device and which credentials to present.
//! - [`input`] – typed values for mouse buttons, ATX buttons, drive modes and
//!   pointer coordinates, plus drag path interpolation.
//! - [`pacing`] – fixed delays the device firmware needs between input events.

pub mod config;
pub mod input;
pub mod pacing;

pub use config::{ConfigError, DeviceConfig, Scheme};
pub use input::{drag_path, AtxButton, DriveMode, MouseButton, Point};
