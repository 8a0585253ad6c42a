// mDNS Responder Task - Hostname des Nodes via Multicast DNS
//
// Der Node ist unter `<hostname>.local` erreichbar (A-Record, RFC 6762).
// Hostname kommt aus dem Namespace "network" und steht erst nach dem
// Laden des Config Store fest.

use defmt::{Debug2Format, error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use core::net::{Ipv4Addr, SocketAddr};
use core::sync::atomic::{AtomicU32, Ordering};

use edge_mdns::{HostAnswersMdnsHandler, buf::VecBufAccess, domain::base::Ttl, host::Host, io};
use edge_nal::{MulticastV4, UdpBind, UdpSplit};
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;

use crate::config::{
    MDNS_MULTICAST_ADDR, MDNS_PACKET_BUFFER_SIZE, MDNS_PORT, MDNS_RECONNECT_DELAY_SECS,
    MDNS_TTL_SECS, MDNS_UDP_BUFFER_SIZE,
};

type MdnsBuffers = UdpBuffers<1, MDNS_UDP_BUFFER_SIZE, MDNS_UDP_BUFFER_SIZE>;

/// Zähler für mDNS Query-IDs (keine Kryptographie nötig)
static RNG_COUNTER: AtomicU32 = AtomicU32::new(0);

fn mdns_rng(buf: &mut [u8]) {
    let mut counter = RNG_COUNTER.fetch_add(1, Ordering::Relaxed);
    for chunk in buf.chunks_mut(4) {
        let bytes = counter.to_le_bytes();
        let len = chunk.len().min(4);
        chunk[..len].copy_from_slice(&bytes[..len]);
        counter = counter.wrapping_add(1);
    }
}

/// mDNS Responder Task
///
/// Wartet auf Link und IPv4-Adresse, beantwortet dann Anfragen nach
/// `hostname.local`. Bei Fehlern neuer Versuch nach
/// `MDNS_RECONNECT_DELAY_SECS`.
#[embassy_executor::task]
pub async fn mdns_responder_task(stack: Stack<'static>, hostname: &'static str) {
    info!("mDNS: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("mDNS: Network ready");

    // Einmal pro Task, Neustarts des Responders nutzen dieselben Buffer
    static UDP_BUFFERS: static_cell::StaticCell<MdnsBuffers> = static_cell::StaticCell::new();
    let udp_buffers: &'static MdnsBuffers = UDP_BUFFERS.init_with(MdnsBuffers::new);

    loop {
        match run_mdns_responder(stack, udp_buffers, hostname).await {
            Ok(_) => warn!("mDNS: Responder stopped normally"),
            Err(e) => error!("mDNS: Error: {}", e),
        }
        info!("mDNS: Reconnecting in {}s...", MDNS_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MDNS_RECONNECT_DELAY_SECS)).await;
    }
}

/// Wartet auf Link und IPv4-Konfiguration (DHCP oder statisch)
async fn wait_for_network(stack: Stack<'static>) {
    while !stack.is_link_up() || stack.config_v4().is_none() {
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Ein Responder-Durchlauf: Socket binden, Gruppe 224.0.0.251 joinen,
/// A-Record für die aktuelle Adresse beantworten
async fn run_mdns_responder(
    stack: Stack<'static>,
    udp_buffers: &'static MdnsBuffers,
    hostname: &'static str,
) -> Result<(), MdnsError> {
    let our_ip = stack
        .config_v4()
        .ok_or(MdnsError::NoAddress)?
        .address
        .address();
    info!("mDNS: Using IP {}", Debug2Format(&our_ip));

    // UDP Adapter (edge-nal-embassy → embassy-net)
    let udp_stack = Udp::new(stack, udp_buffers);

    let mut socket = udp_stack
        .bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), MDNS_PORT))
        .await
        .map_err(|_| MdnsError::SocketBindFailed)?;

    socket
        .join_v4(Ipv4Addr::from(MDNS_MULTICAST_ADDR), Ipv4Addr::UNSPECIFIED)
        .await
        .map_err(|_| MdnsError::MulticastJoinFailed)?;

    let (recv, send) = socket.split();

    // IPv6 nicht unterstützt (kein proto-ipv6 in smoltcp)
    let host = Host {
        hostname,
        ipv4: our_ip.into(),
        ipv6: [0u8; 16].into(),
        ttl: Ttl::from_secs(MDNS_TTL_SECS),
    };

    let recv_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();
    let send_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();

    // Von der API verlangt, hier unbenutzt
    let signal = Signal::<NoopRawMutex, ()>::new();

    let mdns = io::Mdns::new(
        Some(our_ip),
        None,
        recv,
        send,
        recv_buf,
        send_buf,
        mdns_rng,
        &signal,
    );

    info!("mDNS: advertising '{}.local'", hostname);

    // Nur A-Records, kein Service Discovery
    mdns.run(HostAnswersMdnsHandler::new(&host))
        .await
        .map_err(|_| MdnsError::ResponderFailed)?;

    Ok(())
}

#[derive(Debug)]
enum MdnsError {
    /// Adresse zwischen Warten und Binden verloren
    NoAddress,
    SocketBindFailed,
    MulticastJoinFailed,
    ResponderFailed,
}

impl defmt::Format for MdnsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MdnsError::NoAddress => defmt::write!(fmt, "No IPv4 address"),
            MdnsError::SocketBindFailed => defmt::write!(fmt, "Socket bind failed"),
            MdnsError::MulticastJoinFailed => defmt::write!(fmt, "Multicast join failed"),
            MdnsError::ResponderFailed => defmt::write!(fmt, "Responder failed"),
        }
    }
}
