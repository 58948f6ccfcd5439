//! # Delta Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

use delta_lib::panel::GpioPanelParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct DeltaExecParams {
    /// SocketCAN interface the motor and encoder boards are on
    pub can_iface: String,

    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Path played back in UserFollows, relative to the software root
    pub path_file: String,

    /// GPIO panel wiring, no hardware panel is used if unset
    #[serde(default)]
    pub gpio_panel: Option<GpioPanelParams>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeltaExecParams {
    /// The cycle period, or `None` if `cycle_period_s` is not a positive finite number.
    pub fn cycle_period(&self) -> Option<Duration> {
        if self.cycle_period_s.is_finite() && self.cycle_period_s > 0.0 {
            Some(Duration::from_secs_f64(self.cycle_period_s))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn with_period(cycle_period_s: f64) -> DeltaExecParams {
        DeltaExecParams {
            can_iface: "vcan0".into(),
            cycle_period_s,
            path_file: "paths/demo.json".into(),
            gpio_panel: None,
        }
    }

    #[test]
    fn test_cycle_period() {
        let period = with_period(0.02).cycle_period().unwrap();
        assert!((period.as_secs_f64() - 0.02).abs() < 1e-9);

        assert_eq!(with_period(0.0).cycle_period(), None);
        assert_eq!(with_period(-0.02).cycle_period(), None);
        assert_eq!(with_period(std::f64::NAN).cycle_period(), None);
        assert_eq!(with_period(std::f64::INFINITY).cycle_period(), None);
    }
}
