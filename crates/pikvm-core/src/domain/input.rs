//! Typed input values accepted by the device.
//!
//! The device API takes these as lowercase strings (`"left"`, `"power_long"`)
//! or integer flags (`cdrom=1`).  Modelling them as enums keeps typos out of
//! the request builders; [`std::str::FromStr`] implementations accept the wire
//! spelling so command-line front ends can parse them directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A pointer position or delta in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Mouse buttons understood by the HID endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    /// "Back" side button.
    Up,
    /// "Forward" side button.
    Down,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown mouse button '{other}'")),
        }
    }
}

/// Buttons of the target machine's ATX front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtxButton {
    /// Short press of the power button (normal on/off).
    Power,
    /// Long press of the power button (forced off).
    PowerLong,
    /// Reset button.
    Reset,
}

impl AtxButton {
    /// Value of the `button` query parameter of `atx/click`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::PowerLong => "power_long",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for AtxButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtxButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "power" => Ok(Self::Power),
            "power_long" => Ok(Self::PowerLong),
            "reset" => Ok(Self::Reset),
            other => Err(format!("unknown ATX button '{other}'")),
        }
    }
}

/// How the virtual drive presents the active image to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// Read-only optical drive.
    #[default]
    Cdrom,
    /// Removable flash drive.
    Flash,
}

impl DriveMode {
    /// Value of the `cdrom` query parameter of `msd/set_params`.
    pub fn cdrom_flag(self) -> u8 {
        match self {
            Self::Cdrom => 1,
            Self::Flash => 0,
        }
    }
}

/// Intermediate pointer positions for a drag from `from` to `to`.
///
/// Yields exactly `steps` points, computed on demand; point `i` (1-based)
/// lies at fraction `i / steps` of the straight line, with coordinates
/// truncated toward zero.  The last point is always `to`.  `steps == 0`
/// yields no points.
///
/// ```rust
/// use pikvm_core::{drag_path, Point};
///
/// let path: Vec<Point> = drag_path(Point::new(0, 0), Point::new(100, 50), 4).collect();
/// assert_eq!(path, vec![
///     Point::new(25, 12),
///     Point::new(50, 25),
///     Point::new(75, 37),
///     Point::new(100, 50),
/// ]);
/// ```
pub fn drag_path(from: Point, to: Point, steps: u32) -> impl Iterator<Item = Point> {
    let lerp = |a: i32, b: i32, t: f64| -> i32 {
        // `as` truncates toward zero and saturates at the i32 bounds.
        (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as i32
    };

    (1..=steps).map(move |i| {
        let t = f64::from(i) / f64::from(steps);
        Point::new(lerp(from.x, to.x, t), lerp(from.y, to.y, t))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
