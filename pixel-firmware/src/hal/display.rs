// Konsolen-Display
//
// Das Board hat kein Panel; Start-Phasen und Status-Zeilen gehen über
// defmt an die Konsole. Sleep-Timeout und Enable aus dem Namespace
// "display" gelten trotzdem.

use defmt::info;
use pixel_core::types::{DisplaySettings, StartupStatus};
use pixel_core::NodeStatus;

use crate::config::DISPLAY_REFRESH_MS;

pub struct ConsoleDisplay {
    settings: DisplaySettings,
    awake_since_ms: u64,
    last_draw_ms: Option<u64>,
    last_status: NodeStatus,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            settings: DisplaySettings::default(),
            awake_since_ms: 0,
            last_draw_ms: None,
            last_status: NodeStatus::default(),
        }
    }

    pub fn configure(&mut self, settings: &DisplaySettings, now_ms: u64) {
        self.settings = *settings;
        self.awake_since_ms = now_ms;
        info!(
            "Display: enabled={} sleep={}min flip={}",
            settings.enabled, settings.sleep_timeout_min, settings.flip
        );
    }

    pub fn text_status(&mut self, status: StartupStatus) {
        info!("Display: {}", status);
    }

    fn is_asleep(&self, now_ms: u64) -> bool {
        let timeout = self.settings.sleep_timeout_min;
        timeout != 0 && now_ms.saturating_sub(self.awake_since_ms) > u64::from(timeout) * 60_000
    }

    /// Zeichnet eine Status-Zeile; jede Statusänderung weckt das Display
    pub fn run(&mut self, status: &NodeStatus, now_ms: u64) {
        if !self.settings.enabled {
            return;
        }

        let changed = status.receiving() != self.last_status.receiving()
            || status.data_loss != self.last_status.data_loss
            || status.test_pattern != self.last_status.test_pattern
            || status.identify != self.last_status.identify;
        self.last_status = *status;
        if changed {
            self.awake_since_ms = now_ms;
        }
        if self.is_asleep(now_ms) {
            return;
        }

        let due = self
            .last_draw_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= DISPLAY_REFRESH_MS);
        if changed || due {
            self.last_draw_ms = Some(now_ms);
            info!(
                "Display: frames={} dropped={} loss={} sync={} test={} identify={}",
                status.frames,
                status.dropped,
                status.data_loss,
                status.synchronous,
                status.test_pattern,
                status.identify
            );
        }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}
