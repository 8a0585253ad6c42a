// RMT SmartLED Writer
//
// Verbindet einen RMT-Kanal (esp-hal-smartled) mit dem SmartLedWriter Trait
// aus pixel-core. Ein Writer pro Pixel-Port.

use esp_hal_smartled::SmartLedsAdapter;
use pixel_core::{LedError, SmartLedWriter};
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;

use crate::config::RMT_BUFFER_SIZE;

/// Real Hardware LED Writer
///
/// Nutzt einen ESP32 RMT-Kanal um einen WS28xx Strang anzusteuern.
///
/// Der Adapter sendet jedes `RGB8` als G, R, B. Die Bytes aus dem
/// Pixel-Core kommen bereits in Leitungsreihenfolge, deshalb werden
/// `r` und `g` vor dem Senden getauscht.
///
/// Hinweis: Der RMT-Buffer muss 'static sein, daher wird der Adapter in
/// `main` erstellt und hier nur übernommen.
pub struct RmtLedWriter<'a> {
    led: SmartLedsAdapter<'a, RMT_BUFFER_SIZE>,
}

impl<'a> RmtLedWriter<'a> {
    pub fn new(led: SmartLedsAdapter<'a, RMT_BUFFER_SIZE>) -> Self {
        Self { led }
    }
}

impl SmartLedWriter for RmtLedWriter<'_> {
    fn write<I>(&mut self, pixels: I) -> Result<(), LedError>
    where
        I: Iterator<Item = RGB8>,
    {
        // Blockiert bis der Frame raus ist (~10 ms pro 340 Pixel), danach
        // ist der Port wieder frei; `is_updating` bleibt deshalb false.
        self.led
            .write(pixels.map(|px| RGB8 {
                r: px.g,
                g: px.r,
                b: px.b,
            }))
            .map_err(|_| LedError::WriteFailed)
    }
}
