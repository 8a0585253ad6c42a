//! Core Types für den Pixel-Node
//!
//! Datenstrukturen ohne Hardware-Dependencies: Pixel-Konfiguration,
//! RDM-UID, Protokoll-Ereignisse und Netzwerk-/Display-Einstellungen.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximale Anzahl physischer Ausgangs-Ports
pub const MAX_PORTS: usize = 8;

/// Hardware-Maximum an Universen pro Port
pub const MAX_UNIVERSES_PER_PORT: usize = 4;

/// Anzahl Protokoll-Ports (Ports * Slots)
pub const MAX_PROTOCOL_PORTS: usize = MAX_PORTS * MAX_UNIVERSES_PER_PORT;

/// Kanäle pro DMX-Universum
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Kürzt einen Text zeichenweise auf die Kapazität des Strings
pub(crate) fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Richtung eines Protokoll-Ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortDir {
    Output,
    Disable,
}

/// Unterstützte Pixel-Typen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelType {
    WS2801,
    WS2811,
    WS2812,
    WS2812B,
    WS2813,
    WS2815,
    SK6812,
    SK6812W,
    UCS1903,
    UCS2903,
    APA102,
    P9813,
}

impl PixelType {
    /// Kanäle pro Pixel (3 = RGB, 4 = RGBW)
    pub const fn channels(self) -> usize {
        match self {
            PixelType::SK6812W => 4,
            _ => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PixelType::WS2801 => "WS2801",
            PixelType::WS2811 => "WS2811",
            PixelType::WS2812 => "WS2812",
            PixelType::WS2812B => "WS2812B",
            PixelType::WS2813 => "WS2813",
            PixelType::WS2815 => "WS2815",
            PixelType::SK6812 => "SK6812",
            PixelType::SK6812W => "SK6812W",
            PixelType::UCS1903 => "UCS1903",
            PixelType::UCS2903 => "UCS2903",
            PixelType::APA102 => "APA102",
            PixelType::P9813 => "P9813",
        }
    }

    /// Farbreihenfolge auf der Leitung, wenn keine Map konfiguriert ist
    pub const fn default_map(self) -> PixelMap {
        match self {
            PixelType::WS2801
            | PixelType::WS2811
            | PixelType::UCS1903
            | PixelType::UCS2903
            | PixelType::APA102
            | PixelType::P9813 => PixelMap::RGB,
            _ => PixelMap::GRB,
        }
    }
}

/// Farbreihenfolge auf der Datenleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelMap {
    RGB,
    RBG,
    GRB,
    GBR,
    BRG,
    BGR,
}

impl PixelMap {
    /// Sortiert logische RGB-Werte in Leitungsreihenfolge
    ///
    /// ```
    /// # use pixel_core::PixelMap;
    /// assert_eq!(PixelMap::GRB.wire_order([1, 2, 3]), [2, 1, 3]);
    /// ```
    pub const fn wire_order(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        match self {
            PixelMap::RGB => [r, g, b],
            PixelMap::RBG => [r, b, g],
            PixelMap::GRB => [g, r, b],
            PixelMap::GBR => [g, b, r],
            PixelMap::BRG => [b, r, g],
            PixelMap::BGR => [b, g, r],
        }
    }
}

/// Pixel-Konfiguration (Namespace "pixel")
///
/// Wird beim Start aus dem Config-Store geladen und ist danach unveränderlich.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelConfiguration {
    pub pixel_type: PixelType,
    /// Pixel pro Port
    pub count: u16,
    /// `None` = Default-Map des Pixel-Typs
    pub map: Option<PixelMap>,
    /// Anzahl physischer Pixel, die denselben Wert zeigen
    pub grouping: u16,
    pub active_ports: u8,
    /// 0 = Live-Betrieb, sonst Testmuster-ID
    pub test_pattern: u8,
    /// Start-Universum pro Port, `None` = Port deaktiviert
    pub start_universes: [Option<u16>; MAX_PORTS],
}

impl Default for PixelConfiguration {
    fn default() -> Self {
        let mut start_universes = [None; MAX_PORTS];
        for (port, universe) in start_universes.iter_mut().enumerate() {
            *universe = Some(1 + (port * MAX_UNIVERSES_PER_PORT) as u16);
        }
        Self {
            pixel_type: PixelType::WS2812B,
            count: 170,
            map: None,
            grouping: 1,
            active_ports: 1,
            test_pattern: 0,
            start_universes,
        }
    }
}

impl PixelConfiguration {
    pub fn map(&self) -> PixelMap {
        self.map.unwrap_or(self.pixel_type.default_map())
    }

    pub fn channels_per_pixel(&self) -> usize {
        self.pixel_type.channels()
    }

    /// Logische Pixel nach Gruppierung
    pub fn grouped_count(&self) -> usize {
        usize::from(self.count).div_ceil(usize::from(self.grouping.max(1)))
    }

    /// 170 Pixel (RGB) bzw. 128 Pixel (RGBW) pro Universum
    pub fn pixels_per_universe(&self) -> usize {
        match self.channels_per_pixel() {
            4 => 128,
            _ => 170,
        }
    }

    /// Bytes, die ein Universum im Port-Buffer belegt
    pub fn universe_footprint(&self) -> usize {
        self.pixels_per_universe() * self.channels_per_pixel()
    }

    /// Benötigte Universen pro Port (ungeklemmt)
    pub fn universes(&self) -> usize {
        self.grouped_count().div_ceil(self.pixels_per_universe()).max(1)
    }

    pub fn start_universe_port(&self, port: usize) -> Option<u16> {
        self.start_universes.get(port).copied().flatten()
    }

    pub fn active_ports(&self) -> usize {
        usize::from(self.active_ports).min(MAX_PORTS)
    }
}

/// RDM Unique ID (ESTA Hersteller-ID + 32-Bit Geräte-ID)
///
/// Die Feld-Reihenfolge ergibt die 48-Bit Ordnung für Probe-Bereiche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uid {
    pub manufacturer: u16,
    pub device: u32,
}

impl Uid {
    pub const fn new(manufacturer: u16, device: u32) -> Self {
        Self {
            manufacturer,
            device,
        }
    }

    /// Geräte-ID aus den unteren vier Bytes der MAC-Adresse
    pub fn from_hardware_id(manufacturer: u16, mac: [u8; 6]) -> Self {
        Self::new(manufacturer, u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]))
    }

    pub fn to_bytes(self) -> [u8; 6] {
        let [m0, m1] = self.manufacturer.to_be_bytes();
        let [d0, d1, d2, d3] = self.device.to_be_bytes();
        [m0, m1, d0, d1, d2, d3]
    }

    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self::new(
            u16::from_be_bytes([bytes[0], bytes[1]]),
            u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
        )
    }
}

/// Dekodiertes Ereignis vom Protokoll-Transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent<'a> {
    /// Kanaldaten für ein Universum
    Dmx { universe: u16, data: &'a [u8] },
    /// Art-Net OpSync bzw. E1.31 Synchronisation
    Sync,
    /// Art-Net OpPoll
    Poll,
    /// Art-Net OpAddress (nur Namen)
    Address {
        short_name: Option<&'a str>,
        long_name: Option<&'a str>,
    },
}

/// Dekodierte LLRP-Anfrage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlrpRequest<'a> {
    Probe { lower: Uid, upper: Uid },
    Identify(bool),
    SetLabel(&'a str),
    FactoryDefaults,
}

/// Netzwerk-Einstellungen (Namespace "network")
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkConfig {
    pub use_dhcp: bool,
    pub ip: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
    pub hostname: String<32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut hostname = String::new();
        let _ = hostname.push_str("pixel");
        Self {
            use_dhcp: true,
            ip: [0; 4],
            netmask: [255, 255, 255, 0],
            gateway: [0; 4],
            hostname,
        }
    }
}

/// Display-Einstellungen (Namespace "display")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplaySettings {
    pub enabled: bool,
    /// Minuten bis zum Abschalten, 0 = nie
    pub sleep_timeout_min: u8,
    pub flip: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sleep_timeout_min: 5,
            flip: false,
        }
    }
}

/// Start-Phasen für die Statusanzeige
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupStatus {
    Network,
    Pixel,
    Node,
    Rdm,
    Store,
    Started,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_start_universes_are_hardware_aligned() {
        let config = PixelConfiguration::default();
        assert_eq!(config.start_universe_port(0), Some(1));
        assert_eq!(config.start_universe_port(1), Some(5));
        assert_eq!(config.start_universe_port(7), Some(29));
        assert_eq!(config.start_universe_port(8), None);
    }

    #[test]
    fn test_universes_per_port() {
        let mut config = PixelConfiguration::default();
        assert_eq!(config.universes(), 1);

        config.count = 171;
        assert_eq!(config.universes(), 2);

        config.count = 680;
        assert_eq!(config.universes(), 4);

        config.grouping = 4;
        assert_eq!(config.grouped_count(), 170);
        assert_eq!(config.universes(), 1);
    }

    #[test]
    fn test_rgbw_footprint() {
        let config = PixelConfiguration {
            pixel_type: PixelType::SK6812W,
            count: 256,
            ..Default::default()
        };
        assert_eq!(config.pixels_per_universe(), 128);
        assert_eq!(config.universe_footprint(), 512);
        assert_eq!(config.universes(), 2);
    }

    #[test]
    fn test_uid_ordering_and_bytes() {
        let low = Uid::new(0x7FF0, 0xFFFF_FFFF);
        let high = Uid::new(0x7FF1, 0);
        assert!(low < high);

        let uid = Uid::from_hardware_id(0x7FF0, [0xAA, 0xBB, 1, 2, 3, 4]);
        assert_eq!(uid.device, 0x0102_0304);
        assert_eq!(Uid::from_bytes(uid.to_bytes()), uid);
    }

    #[test]
    fn test_pixel_map_wire_order() {
        assert_eq!(PixelMap::RGB.wire_order([1, 2, 3]), [1, 2, 3]);
        assert_eq!(PixelMap::BGR.wire_order([1, 2, 3]), [3, 2, 1]);
        assert_eq!(PixelType::WS2812B.default_map(), PixelMap::GRB);
        assert_eq!(PixelType::WS2811.default_map(), PixelMap::RGB);
    }
}
