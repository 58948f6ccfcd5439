//! Raspberry Pi panel

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use std::time::{Duration, Instant};

use super::{GpioPanelParams, Indicator, Panel};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The cabinet panel wired to the Pi's GPIO header.
///
/// The button pulls its pin low when pressed, a press is a debounced falling edge.
pub struct GpioPanel {
    button: InputPin,
    robot_leads: OutputPin,
    user_leads: OutputPin,

    debounce: Duration,
    last_level: Level,
    last_edge: Option<Instant>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GpioPanel {
    pub fn new(params: &GpioPanelParams) -> Result<Self, rppal::gpio::Error> {
        let gpio = Gpio::new()?;

        let button = gpio.get(params.button_pin)?.into_input_pullup();
        let mut robot_leads = gpio.get(params.robot_leads_pin)?.into_output();
        let mut user_leads = gpio.get(params.user_leads_pin)?.into_output();

        robot_leads.set_low();
        user_leads.set_low();

        let last_level = button.read();

        Ok(Self {
            button,
            robot_leads,
            user_leads,
            debounce: Duration::from_secs_f64(params.debounce_s.max(0.0)),
            last_level,
            last_edge: None,
        })
    }
}

impl Panel for GpioPanel {
    fn button_pressed(&mut self) -> bool {
        let level = self.button.read();
        let falling = self.last_level == Level::High && level == Level::Low;
        self.last_level = level;

        if !falling {
            return false;
        }

        let now = Instant::now();
        match self.last_edge {
            Some(t) if now.duration_since(t) < self.debounce => false,
            _ => {
                self.last_edge = Some(now);
                true
            }
        }
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        let pin = match indicator {
            Indicator::RobotLeads => &mut self.robot_leads,
            Indicator::UserLeads => &mut self.user_leads,
        };

        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }
}
