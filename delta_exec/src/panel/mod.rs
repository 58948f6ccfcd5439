//! # Panel module
//!
//! The panel is the cabinet's push button, which starts a round, and one lamp for each of the two
//! competitive modes.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "linux"))]
mod gpio;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[cfg(all(target_arch = "arm", target_os = "linux"))]
pub use gpio::GpioPanel;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Panel: Send {
    /// Returns true once for every press of the button since the last call.
    fn button_pressed(&mut self) -> bool;

    /// Switch one of the lamps.
    fn set_indicator(&mut self, indicator: Indicator, on: bool);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// BCM pin numbers and button debounce time of the GPIO panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioPanelParams {
    pub button_pin: u8,
    pub robot_leads_pin: u8,
    pub user_leads_pin: u8,

    /// Units: seconds
    pub debounce_s: f64,
}

/// A panel with no hardware behind it.
///
/// Lamp changes are logged, and the button is pressed through a cloned handle, for example from
/// the keyboard.
#[derive(Clone, Default)]
pub struct NullPanel {
    inner: Arc<Mutex<NullPanelState>>,
}

#[derive(Default)]
struct NullPanelState {
    pending_presses: usize,
    robot_leads: bool,
    user_leads: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    /// Lit during the RobotFollows mode.
    RobotLeads,

    /// Lit during the UserFollows mode.
    UserLeads,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NullPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        if let Ok(mut s) = self.inner.lock() {
            s.pending_presses += 1;
        }
    }

    pub fn indicator(&self, indicator: Indicator) -> bool {
        match self.inner.lock() {
            Ok(s) => match indicator {
                Indicator::RobotLeads => s.robot_leads,
                Indicator::UserLeads => s.user_leads,
            },
            Err(_) => false,
        }
    }
}

impl Panel for NullPanel {
    fn button_pressed(&mut self) -> bool {
        match self.inner.lock() {
            Ok(mut s) if s.pending_presses > 0 => {
                s.pending_presses -= 1;
                true
            }
            _ => false,
        }
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        if let Ok(mut s) = self.inner.lock() {
            let lamp = match indicator {
                Indicator::RobotLeads => &mut s.robot_leads,
                Indicator::UserLeads => &mut s.user_leads,
            };

            if *lamp != on {
                info!("{:?} indicator {}", indicator, if on { "on" } else { "off" });
            }
            *lamp = on;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_panel() {
        let handle = NullPanel::new();
        let mut panel = handle.clone();

        assert!(!panel.button_pressed());
        handle.press();
        assert!(panel.button_pressed());
        assert!(!panel.button_pressed());

        panel.set_indicator(Indicator::UserLeads, true);
        assert!(handle.indicator(Indicator::UserLeads));
        assert!(!handle.indicator(Indicator::RobotLeads));
    }
}
