//! Hardware Abstraction Traits
//!
//! Diese Traits definieren die Schnittstellen zu den externen Kollaborateuren
//! (Pixel-Treiber, Netzwerk, LLRP, Remote-Config, Plattform) ohne konkrete
//! Implementierung.
//!
//! # Implementierungen
//! - **Production:** `pixel-firmware` (ESP32-C6: RMT, embassy-net, esp-storage)
//! - **Testing:** Mocks in `pixel-tests`

use rgb::RGB8;

use crate::codec::PollReplyPage;
use crate::node::NodeStatus;
use crate::types::{
    DisplaySettings, LlrpRequest, NetworkConfig, PixelConfiguration, PixelType, ProtocolEvent,
    StartupStatus, Uid,
};

/// Fehler-Typ für LED-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    WriteFailed,
}

/// Trait für SmartLED Hardware-Zugriff
///
/// Abstrahiert einen Strang WS28xx LEDs.
///
/// Die Kanäle von `RGB8` tragen die Bytes bereits in Leitungsreihenfolge
/// (`r` = erstes Byte, `g` = zweites, `b` = drittes).
pub trait SmartLedWriter {
    /// Schreibt alle Pixel eines Strangs
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::WriteFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn write<I>(&mut self, pixels: I) -> Result<(), LedError>
    where
        I: Iterator<Item = RGB8>;
}

/// Physischer Pixel-Treiber
pub trait PixelDriver {
    fn max_ports(&self) -> usize;

    /// Pixel-Kapazität pro Port
    fn max_pixels(&self) -> usize;

    fn supports(&self, pixel_type: PixelType) -> bool;

    /// `true` solange eine Übertragung (DMA) läuft
    fn is_updating(&self) -> bool;

    /// Überträgt den logischen Port-Buffer (RGB bzw. RGBW pro Pixel)
    fn update(
        &mut self,
        port: usize,
        data: &[u8],
        config: &PixelConfiguration,
    ) -> Result<(), LedError>;

    /// Setzt alle Ausgänge auf 0, muss vor einem Reset abgeschlossen sein
    fn blackout(&mut self, config: &PixelConfiguration);
}

/// Art-Net / E1.31 Transport
pub trait ProtocolTransport {
    /// Nicht-blockierend: `None` wenn kein Paket anliegt
    fn receive(&mut self) -> Option<ProtocolEvent<'_>>;

    fn send_poll_reply(&mut self, page: &PollReplyPage<'_>);

    /// Multicast-Mitgliedschaft (E1.31)
    fn join(&mut self, _universe: u16) {}
}

/// LLRP Transport (RDM über IP)
pub trait LlrpTransport {
    fn receive(&mut self) -> Option<LlrpRequest<'_>>;

    /// Antwortet auf die zuletzt empfangene Probe-Anfrage
    fn send_probe_reply(&mut self, uid: Uid);
}

/// Transport des Remote-Config-Dienstes
pub trait RemoteTransport {
    /// Kopiert die nächste Anfrage nach `buf`
    fn receive(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Antwort an den Absender der letzten Anfrage
    fn reply(&mut self, data: &[u8]);
}

/// Persistenz-Hook des Protokoll-Knotens (OpAddress)
pub trait NodeStore {
    fn save_short_name(&mut self, name: &str);
    fn save_long_name(&mut self, name: &str);
}

/// Persistenz-Hook des RDM-Geräts
pub trait RdmStore {
    fn save_label(&mut self, label: &str);
    fn factory_reset(&mut self);
}

/// Plattform: alles, was der Run-Loop von der Hardware braucht
///
/// Die Firmware implementiert diesen Trait einmal für das Board;
/// der Runtime besitzt die Instanz für die gesamte Laufzeit.
pub trait Platform {
    type Transport: ProtocolTransport;
    type Llrp: LlrpTransport;
    type Remote: RemoteTransport;

    fn init_network(&mut self, config: &NetworkConfig);
    fn configure_display(&mut self, settings: &DisplaySettings);
    fn text_status(&mut self, status: StartupStatus);

    fn init_watchdog(&mut self);
    fn feed_watchdog(&mut self);

    /// Ein nicht-blockierender Durchlauf des Netzwerk-Stacks
    fn run_network(&mut self);

    fn protocol(&mut self) -> &mut Self::Transport;
    fn llrp(&mut self) -> &mut Self::Llrp;
    fn remote(&mut self) -> &mut Self::Remote;

    /// Status-LED, Display, mDNS
    fn run_housekeeping(&mut self, status: &NodeStatus);

    /// Flankengesteuert: `true` einmal pro Reboot-Anforderung
    fn take_reboot_request(&mut self) -> bool;

    /// Monotone Zeit in Millisekunden
    fn now_ms(&self) -> u64;

    /// MAC-Adresse
    fn hardware_id(&self) -> [u8; 6];

    /// Neustart; kehrt auf echter Hardware nicht zurück
    fn reset(&mut self);
}
