//! Status-LED Blinkmuster
//!
//! Leitet aus dem `NodeStatus` ein Blinkmuster ab. Die Firmware schaltet
//! nur noch den Pin, wenn `run()` einen neuen Pegel liefert.

use crate::node::NodeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkMode {
    /// Gestartet, aber keine Daten
    NoData,
    /// Datenstrom läuft
    Data,
    /// Datenverlust (Failsafe aktiv)
    DataLoss,
    /// RDM Identify: schnelles Blinken
    Identify,
    /// Testmuster läuft: Dauer an
    TestPattern,
    /// Start noch nicht abgeschlossen: aus
    Off,
}

impl BlinkMode {
    pub fn from_status(status: &NodeStatus) -> Self {
        if status.identify {
            BlinkMode::Identify
        } else if status.test_pattern {
            BlinkMode::TestPattern
        } else if !status.started {
            BlinkMode::Off
        } else if status.data_loss {
            BlinkMode::DataLoss
        } else if status.receiving() {
            BlinkMode::Data
        } else {
            BlinkMode::NoData
        }
    }

    /// Halbe Periode in ms; `None` = statischer Pegel
    pub const fn half_period_ms(self) -> Option<u64> {
        match self {
            BlinkMode::NoData => Some(500),
            BlinkMode::Data => Some(166),
            BlinkMode::DataLoss => Some(100),
            BlinkMode::Identify => Some(50),
            BlinkMode::TestPattern | BlinkMode::Off => None,
        }
    }

    const fn steady_level(self) -> bool {
        matches!(self, BlinkMode::TestPattern)
    }
}

pub struct StatusIndicator {
    mode: BlinkMode,
    level: bool,
    last_toggle_ms: u64,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator {
    pub const fn new() -> Self {
        Self {
            mode: BlinkMode::Off,
            level: false,
            last_toggle_ms: 0,
        }
    }

    pub fn mode(&self) -> BlinkMode {
        self.mode
    }

    /// Liefert den neuen Pegel, wenn er sich ändert
    pub fn run(&mut self, status: &NodeStatus, now_ms: u64) -> Option<bool> {
        let mode = BlinkMode::from_status(status);
        if mode != self.mode {
            debug!("Status: mode {}", mode);
            self.mode = mode;
            self.last_toggle_ms = now_ms;
            let level = match mode.half_period_ms() {
                Some(_) => true,
                None => mode.steady_level(),
            };
            return self.set_level(level);
        }

        let half = mode.half_period_ms()?;
        if now_ms.saturating_sub(self.last_toggle_ms) < half {
            return None;
        }
        self.last_toggle_ms = now_ms;
        self.set_level(!self.level)
    }

    fn set_level(&mut self, level: bool) -> Option<bool> {
        if level == self.level {
            return None;
        }
        self.level = level;
        Some(level)
    }
}
