//! # Pointer module
//!
//! The pointer is the player's position on the screen, from a mouse or from a touch foil laid
//! over the screen. Positions are pushed into a [`SharedPointer`] by whatever captures the input
//! and read once per cycle by the mode manager, which maps them into robot coordinates with a
//! [`ScreenArea`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Anything able to give the current pointer position.
pub trait PointerSource: Send {
    /// Latest position in screen pixels, or `None` if the pointer isn't on the screen.
    fn position_px(&self) -> Option<(f64, f64)>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Screen geometry and its mapping onto the robot's working plane.
///
/// The usable area is a centred sub-rectangle of the screen which lies under the robot's reach.
/// Its left-right axis maps to robot x, and its top-bottom axis to robot -y, both over
/// `[-radius_m, radius_m]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenArea {
    pub width_px: f64,
    pub height_px: f64,
    pub usable_width_px: f64,
    pub usable_height_px: f64,

    /// Half the side of the square of the working plane the usable area covers.
    ///
    /// Units: meters
    pub radius_m: f64,
}

/// A pointer shared between the input capture and the control loop.
#[derive(Clone)]
pub struct SharedPointer {
    kind: PointerKind,
    screen: ScreenArea,
    position_px: Arc<Mutex<Option<(f64, f64)>>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    /// Reports screen pixels directly.
    Mouse,

    /// Mounted rotated by a quarter turn, reports in its own frame.
    Touchfoil,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ScreenArea {
    fn default() -> Self {
        Self {
            width_px: 1440.0,
            height_px: 900.0,
            usable_width_px: 900.0,
            usable_height_px: 900.0,
            radius_m: 0.04,
        }
    }
}

impl ScreenArea {
    /// Usable area bounds, `(left, top, right, bottom)`.
    pub fn usable_rect(&self) -> (f64, f64, f64, f64) {
        let left = (self.width_px - self.usable_width_px) / 2.0;
        let top = (self.height_px - self.usable_height_px) / 2.0;

        (
            left,
            top,
            left + self.usable_width_px,
            top + self.usable_height_px,
        )
    }

    /// Map a screen position onto the working plane.
    ///
    /// Units: meters
    pub fn to_robot(&self, position_px: (f64, f64)) -> (f64, f64) {
        let (left, top, right, bottom) = self.usable_rect();
        let r = self.radius_m;

        (
            lin_map((left, right), (-r, r), position_px.0),
            lin_map((top, bottom), (r, -r), position_px.1),
        )
    }

    /// Map a working plane position onto the screen.
    ///
    /// Units: pixels
    pub fn to_screen(&self, position_m: (f64, f64)) -> (f64, f64) {
        let (left, top, right, bottom) = self.usable_rect();
        let r = self.radius_m;

        (
            lin_map((-r, r), (left, right), position_m.0),
            lin_map((r, -r), (top, bottom), position_m.1),
        )
    }

    /// Convert a raw touch foil reading into screen pixels.
    pub fn touchfoil_to_screen(&self, raw: (f64, f64)) -> (f64, f64) {
        (
            lin_map((self.height_px, 0.0), (0.0, self.width_px), raw.1),
            lin_map((0.0, self.width_px), (0.0, self.height_px), raw.0),
        )
    }
}

impl SharedPointer {
    pub fn new(kind: PointerKind, screen: ScreenArea) -> Self {
        Self {
            kind,
            screen,
            position_px: Arc::new(Mutex::new(None)),
        }
    }

    /// Record a new raw reading from the input device.
    pub fn push(&self, raw: (f64, f64)) {
        let position = match self.kind {
            PointerKind::Mouse => raw,
            PointerKind::Touchfoil => self.screen.touchfoil_to_screen(raw),
        };

        if let Ok(mut p) = self.position_px.lock() {
            *p = Some(position);
        }
    }

    /// Mark the pointer as having left the screen.
    pub fn release(&self) {
        if let Ok(mut p) = self.position_px.lock() {
            *p = None;
        }
    }
}

impl PointerSource for SharedPointer {
    fn position_px(&self) -> Option<(f64, f64)> {
        self.position_px.lock().ok().and_then(|p| *p)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Distance between two screen positions.
///
/// Units: pixels
pub fn distance_px(a: (f64, f64), b: (f64, f64)) -> f64 {
    util::maths::norm(&[a.0, a.1], &[b.0, b.1]).unwrap_or(0.0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: (f64, f64), b: (f64, f64)) {
        assert!(distance_px(a, b) < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_screen_mapping() {
        let screen = ScreenArea::default();

        assert_eq!(screen.usable_rect(), (270.0, 0.0, 1170.0, 900.0));

        // Centre, corners and back
        assert_close(screen.to_robot((720.0, 450.0)), (0.0, 0.0));
        assert_close(screen.to_robot((270.0, 0.0)), (-0.04, 0.04));
        assert_close(screen.to_robot((1170.0, 900.0)), (0.04, -0.04));
        assert_close(screen.to_screen((0.02, -0.01)), (945.0, 562.5));
        assert_close(screen.to_screen(screen.to_robot((300.0, 123.0))), (300.0, 123.0));
    }

    #[test]
    fn test_touchfoil_pointer() {
        let screen = ScreenArea::default();
        let pointer = SharedPointer::new(PointerKind::Touchfoil, screen);

        assert!(pointer.position_px().is_none());

        pointer.push((0.0, 900.0));
        assert_close(pointer.position_px().unwrap(), (0.0, 0.0));

        pointer.push((1440.0, 0.0));
        assert_close(pointer.position_px().unwrap(), (1440.0, 900.0));

        pointer.release();
        assert!(pointer.position_px().is_none());
    }

    #[test]
    fn test_mouse_pointer_shared() {
        let pointer = SharedPointer::new(PointerKind::Mouse, ScreenArea::default());
        let writer = pointer.clone();

        writer.push((10.0, 20.0));
        assert_eq!(pointer.position_px(), Some((10.0, 20.0)));
    }
}
