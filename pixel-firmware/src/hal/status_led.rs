// Status-LED
//
// Einfacher GPIO-Ausgang. Das Blinkmuster kommt aus dem StatusIndicator
// des Pixel-Core, hier wird nur der Pegel gesetzt.

use esp_hal::gpio::{Level, Output};
use pixel_core::{NodeStatus, StatusIndicator};

pub struct StatusLed {
    pin: Output<'static>,
    indicator: StatusIndicator,
}

impl StatusLed {
    pub fn new(pin: Output<'static>) -> Self {
        Self {
            pin,
            indicator: StatusIndicator::new(),
        }
    }

    pub fn run(&mut self, status: &NodeStatus, now_ms: u64) {
        if let Some(on) = self.indicator.run(status, now_ms) {
            self.pin.set_level(Level::from(on));
        }
    }
}
