// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

use pixel_core::Protocol;

// ============================================================================
// Firmware
// ============================================================================

/// Firmware-Version (Remote-Config `?version#`, ArtPollReply)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DMX-Protokoll dieses Builds
pub const PROTOCOL: Protocol = Protocol::ArtNet;

/// Werks-Label des RDM-Geräts
pub const DEVICE_LABEL: &str = "Pixel Node";

// ============================================================================
// Pixel-Ausgänge (RMT)
// ============================================================================

/// GPIO-Pin für Pixel-Port 0 (RMT Channel 0)
pub const PIXEL_PORT0_GPIO: u8 = 4;

/// GPIO-Pin für Pixel-Port 1 (RMT Channel 1)
pub const PIXEL_PORT1_GPIO: u8 = 5;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

/// Pixel-Kapazität pro Port (2 Universen à 170 RGB-Pixel)
pub const MAX_PIXELS_PER_PORT: usize = 340;

/// RMT Pulse-Buffer pro Port (24 Bits pro Pixel + 1 Reset)
pub const RMT_BUFFER_SIZE: usize = MAX_PIXELS_PER_PORT * 24 + 1;

// ============================================================================
// Status-LED, Taster, Watchdog
// ============================================================================

/// GPIO-Pin der Status-LED (einfacher Ausgang, kein RMT)
pub const STATUS_LED_GPIO: u8 = 15;

/// BOOT-Taster (GPIO9, low-aktiv): löst einen Neustart aus
pub const BOOT_BUTTON_GPIO: u8 = 9;

/// Hardware-Watchdog (TIMG1 MWDT) Timeout in Millisekunden
pub const WATCHDOG_TIMEOUT_MS: u64 = 2_000;

// ============================================================================
// Konsolen-Display
// ============================================================================

/// Abstand zwischen zwei Status-Zeilen in Millisekunden
pub const DISPLAY_REFRESH_MS: u64 = 10_000;

// ============================================================================
// Config Store
// ============================================================================

/// Flash-Offset des Config-Sektors (NVS-Partition der Standard-Tabelle)
pub const CONFIG_STORE_OFFSET: u32 = 0x9000;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file mit WIFI_SSID=..."
);

/// WiFi Passwort
/// Wird zur Build-Zeit aus der Environment Variable WIFI_PASSWORD geladen
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file mit WIFI_PASSWORD=..."
);

/// Heap-Größe für WiFi (Bytes)
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes) für Pixel-Buffer und Config-Abbild
pub const EXTRA_HEAP_SIZE: usize = 49152; // 48 KB

/// WiFi Reconnect Delay in Sekunden
pub const WIFI_RECONNECT_DELAY_SECS: u64 = 5;

// ============================================================================
// UDP Sockets
// ============================================================================

/// Socket-Slots im embassy-net Stack
/// DMX (1) + LLRP (1) + Remote-Config (1) + mDNS (1) + DHCP (1) + Reserve
pub const NET_SOCKETS: usize = 6;

/// Größter erwarteter Datagram (E1.31 mit 512 Slots: 638 Bytes)
pub const UDP_FRAME_SIZE: usize = 1024;

/// RX-Buffer des DMX-Sockets (mehrere Universen pro Frame puffern)
pub const DMX_RX_BUFFER_SIZE: usize = 8192;

/// RX-Buffer für LLRP und Remote-Config
pub const CONTROL_RX_BUFFER_SIZE: usize = 1536;

/// TX-Buffer aller Sockets (ArtPollReply-Seiten, Antworten)
pub const UDP_TX_BUFFER_SIZE: usize = 1536;

/// LLRP Request-Gruppe (E1.33)
pub const LLRP_REQUEST_GROUP: [u8; 4] = [239, 255, 250, 133];

/// LLRP Response-Gruppe (E1.33)
pub const LLRP_RESPONSE_GROUP: [u8; 4] = [239, 255, 250, 134];

/// Art-Net Broadcast für ArtPollReply
pub const ARTNET_BROADCAST: [u8; 4] = [255, 255, 255, 255];

// ============================================================================
// mDNS-Konfiguration
// ============================================================================

/// mDNS TTL (Time To Live) in Sekunden
pub const MDNS_TTL_SECS: u32 = 120;

/// mDNS Reconnect Delay in Sekunden
pub const MDNS_RECONNECT_DELAY_SECS: u64 = 5;

/// mDNS Port (Standard: 5353)
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 Multicast-Adresse (224.0.0.251)
pub const MDNS_MULTICAST_ADDR: [u8; 4] = [224, 0, 0, 251];

/// UDP Buffer-Größen für mDNS (TX, RX in Bytes)
pub const MDNS_UDP_BUFFER_SIZE: usize = 512;

/// mDNS Receive/Send Buffer-Größen in Bytes
pub const MDNS_PACKET_BUFFER_SIZE: usize = 1500;
