// Board: Platform-Implementierung für den ESP32-C6
//
// Besitzt alles, was der Run-Loop von der Hardware braucht: WiFi/Netz,
// Transporte, Watchdog, Status-LED, BOOT-Taster und Konsolen-Display.
// Der Netz-Stack entsteht erst in `init_network`, weil die IP-Konfiguration
// aus dem Config Store kommt.

use defmt::{Debug2Format, error, info, warn};
use embassy_executor::Spawner;
use embassy_net::{
    Config as NetConfig, Ipv4Address, Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4,
};
use esp_hal::gpio::Input;
use esp_hal::peripherals::TIMG1;
use esp_hal::time::{Duration, Instant};
use esp_hal::timer::timg::{MwdtStage, Wdt};
use esp_radio::wifi::{WifiController, WifiDevice};
use heapless::String;
use pixel_core::codec::{ARTNET_PORT, E131_PORT, LLRP_PORT};
use pixel_core::remote::REMOTE_CONFIG_PORT;
use pixel_core::types::{DisplaySettings, NetworkConfig, StartupStatus};
use pixel_core::{NodeStatus, Platform, Protocol};

use crate::config::{
    CONTROL_RX_BUFFER_SIZE, DMX_RX_BUFFER_SIZE, LLRP_REQUEST_GROUP, NET_SOCKETS,
    WATCHDOG_TIMEOUT_MS,
};
use crate::hal::{ConsoleDisplay, StatusLed};
use crate::mk_static;
use crate::net::socket::ipv4;
use crate::net::{DmxTransport, LlrpSocket, RemoteSocket, SocketBuffers, UdpPort};
use crate::tasks::{connection_task, mdns_responder_task, net_task};

/// WiFi-Hälften aus `esp_radio::wifi::new`
pub struct Radio {
    pub controller: WifiController<'static>,
    pub device: WifiDevice<'static>,
}

pub struct Board {
    spawner: Spawner,
    protocol: Protocol,
    /// Bis `init_network` geparkt
    radio: Option<Radio>,
    seed: u64,
    mac: [u8; 6],
    stack: Option<Stack<'static>>,
    ip: Option<[u8; 4]>,

    dmx: DmxTransport,
    llrp: LlrpSocket,
    remote: RemoteSocket,

    watchdog: Wdt<TIMG1<'static>>,
    status_led: StatusLed,
    display: ConsoleDisplay,
    button: Input<'static>,
    button_pressed: bool,
}

impl Board {
    pub fn new(
        spawner: Spawner,
        protocol: Protocol,
        radio: Radio,
        seed: u64,
        watchdog: Wdt<TIMG1<'static>>,
        status_led: StatusLed,
        button: Input<'static>,
    ) -> Self {
        let mac = radio.device.mac_address();
        Self {
            spawner,
            protocol,
            radio: Some(radio),
            seed,
            mac,
            stack: None,
            ip: None,
            dmx: DmxTransport::new(protocol, mac),
            llrp: LlrpSocket::new(mac),
            remote: RemoteSocket::default(),
            watchdog,
            status_led,
            display: ConsoleDisplay::new(),
            button,
            button_pressed: false,
        }
    }

    fn bind_sockets(&mut self, stack: Stack<'static>) {
        let dmx_port = match self.protocol {
            Protocol::ArtNet => ARTNET_PORT,
            Protocol::E131 => E131_PORT,
        };
        let buffers = mk_static!(
            SocketBuffers<DMX_RX_BUFFER_SIZE>,
            SocketBuffers::new()
        );
        match UdpPort::bind(stack, buffers, dmx_port) {
            Ok(port) => self.dmx.attach(stack, port),
            Err(e) => error!("Net: bind {} failed: {}", dmx_port, Debug2Format(&e)),
        }

        let buffers = mk_static!(
            SocketBuffers<CONTROL_RX_BUFFER_SIZE>,
            SocketBuffers::new()
        );
        match UdpPort::bind(stack, buffers, LLRP_PORT) {
            Ok(port) => {
                if let Err(e) = stack.join_multicast_group(ipv4(LLRP_REQUEST_GROUP)) {
                    warn!("LLRP: multicast join failed: {}", Debug2Format(&e));
                }
                self.llrp.attach(port);
            }
            Err(e) => error!("Net: bind {} failed: {}", LLRP_PORT, Debug2Format(&e)),
        }

        let buffers = mk_static!(
            SocketBuffers<CONTROL_RX_BUFFER_SIZE>,
            SocketBuffers::new()
        );
        match UdpPort::bind(stack, buffers, REMOTE_CONFIG_PORT) {
            Ok(port) => self.remote.attach(port),
            Err(e) => error!(
                "Net: bind {} failed: {}",
                REMOTE_CONFIG_PORT,
                Debug2Format(&e)
            ),
        }
    }

    fn spawn_network_tasks(
        &self,
        controller: WifiController<'static>,
        runner: Runner<'static, WifiDevice<'static>>,
        stack: Stack<'static>,
        hostname: &'static str,
    ) {
        if let Err(e) = self.spawner.spawn(connection_task(controller)) {
            error!("Net: spawn wifi task failed: {}", Debug2Format(&e));
        }
        if let Err(e) = self.spawner.spawn(net_task(runner)) {
            error!("Net: spawn net task failed: {}", Debug2Format(&e));
        }
        if let Err(e) = self.spawner.spawn(mdns_responder_task(stack, hostname)) {
            error!("Net: spawn mDNS task failed: {}", Debug2Format(&e));
        }
    }
}

/// Statische IPv4-Konfiguration aus dem Namespace "network"
fn static_config(config: &NetworkConfig) -> StaticConfigV4 {
    let prefix = u32::from_be_bytes(config.netmask).leading_ones() as u8;
    let gateway = (config.gateway != [0; 4]).then(|| Ipv4Address::from(config.gateway));
    StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::from(config.ip), prefix),
        gateway,
        dns_servers: Default::default(),
    }
}

impl Platform for Board {
    type Transport = DmxTransport;
    type Llrp = LlrpSocket;
    type Remote = RemoteSocket;

    fn init_network(&mut self, config: &NetworkConfig) {
        let Some(Radio { controller, device }) = self.radio.take() else {
            warn!("Net: already initialized");
            return;
        };

        let net_config = if config.use_dhcp {
            info!("Net: DHCP, hostname '{}'", config.hostname.as_str());
            NetConfig::dhcpv4(Default::default())
        } else {
            info!(
                "Net: static {}.{}.{}.{}",
                config.ip[0], config.ip[1], config.ip[2], config.ip[3]
            );
            NetConfig::ipv4_static(static_config(config))
        };

        let resources = mk_static!(StackResources<NET_SOCKETS>, StackResources::new());
        let (stack, runner) = embassy_net::new(device, net_config, resources, self.seed);
        let hostname = mk_static!(String<32>, config.hostname.clone());

        self.spawn_network_tasks(controller, runner, stack, hostname.as_str());
        self.bind_sockets(stack);
        self.stack = Some(stack);
    }

    fn configure_display(&mut self, settings: &DisplaySettings) {
        let now = self.now_ms();
        self.display.configure(settings, now);
    }

    fn text_status(&mut self, status: StartupStatus) {
        self.display.text_status(status);
    }

    fn init_watchdog(&mut self) {
        self.watchdog.set_timeout(
            MwdtStage::Stage0,
            Duration::from_millis(WATCHDOG_TIMEOUT_MS),
        );
        self.watchdog.enable();
        info!("Watchdog: armed, {} ms", WATCHDOG_TIMEOUT_MS);
    }

    fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }

    /// embassy-net läuft im `net_task`; hier nur Adresswechsel melden
    fn run_network(&mut self) {
        let Some(stack) = self.stack else {
            return;
        };
        let ip = stack.config_v4().map(|c| c.address.address().octets());
        if ip != self.ip {
            match ip {
                Some([a, b, c, d]) => info!("Net: IP {}.{}.{}.{}", a, b, c, d),
                None => warn!("Net: IP address lost"),
            }
            self.ip = ip;
        }
    }

    fn protocol(&mut self) -> &mut DmxTransport {
        &mut self.dmx
    }

    fn llrp(&mut self) -> &mut LlrpSocket {
        &mut self.llrp
    }

    fn remote(&mut self) -> &mut RemoteSocket {
        &mut self.remote
    }

    fn run_housekeeping(&mut self, status: &NodeStatus) {
        let now = self.now_ms();
        self.status_led.run(status, now);
        self.display.run(status, now);
    }

    fn take_reboot_request(&mut self) -> bool {
        // BOOT-Taster ist low-aktiv, nur die fallende Flanke zählt
        let pressed = self.button.is_low();
        let edge = pressed && !self.button_pressed;
        self.button_pressed = pressed;
        if edge {
            info!("Board: reboot button pressed");
        }
        edge
    }

    fn now_ms(&self) -> u64 {
        Instant::now().duration_since_epoch().as_millis()
    }

    fn hardware_id(&self) -> [u8; 6] {
        self.mac
    }

    fn reset(&mut self) {
        esp_hal::system::software_reset();
    }
}
