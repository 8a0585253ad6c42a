// Nicht-blockierender UDP-Socket über embassy-net
//
// Der Run-Loop ist synchron: jeder Zugriff pollt das Future genau einmal.
// `Pending` heißt "kein Datagram" bzw. "TX-Buffer voll".

use core::task::Poll;

use defmt::{Debug2Format, warn};
use embassy_futures::poll_once;
use embassy_net::udp::{BindError, PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};

use crate::config::UDP_TX_BUFFER_SIZE;

const RX_META: usize = 16;
const TX_META: usize = 4;

/// IPv4-Adresse aus Oktetten
pub fn ipv4(octets: [u8; 4]) -> IpAddress {
    let [a, b, c, d] = octets;
    IpAddress::v4(a, b, c, d)
}

/// Statische Socket-Buffer (einmal pro Socket, via `mk_static!`)
pub struct SocketBuffers<const RX: usize> {
    rx_meta: [PacketMetadata; RX_META],
    rx: [u8; RX],
    tx_meta: [PacketMetadata; TX_META],
    tx: [u8; UDP_TX_BUFFER_SIZE],
}

impl<const RX: usize> SocketBuffers<RX> {
    pub const fn new() -> Self {
        Self {
            rx_meta: [PacketMetadata::EMPTY; RX_META],
            rx: [0; RX],
            tx_meta: [PacketMetadata::EMPTY; TX_META],
            tx: [0; UDP_TX_BUFFER_SIZE],
        }
    }
}

pub struct UdpPort {
    socket: UdpSocket<'static>,
    /// Absender des zuletzt empfangenen Datagrams
    peer: Option<IpEndpoint>,
}

impl UdpPort {
    pub fn bind<const RX: usize>(
        stack: Stack<'static>,
        buffers: &'static mut SocketBuffers<RX>,
        port: u16,
    ) -> Result<Self, BindError> {
        let SocketBuffers {
            rx_meta,
            rx,
            tx_meta,
            tx,
        } = buffers;
        let mut socket = UdpSocket::new(stack, rx_meta, rx, tx_meta, tx);
        socket.bind(port)?;
        Ok(Self { socket, peer: None })
    }

    /// Nächstes Datagram nach `buf`, `None` wenn nichts anliegt
    pub fn try_recv(&mut self, buf: &mut [u8]) -> Option<usize> {
        match poll_once(self.socket.recv_from(buf)) {
            Poll::Ready(Ok((len, meta))) => {
                self.peer = Some(meta.endpoint);
                Some(len)
            }
            Poll::Ready(Err(e)) => {
                // Truncated: Datagram größer als der Frame-Buffer
                warn!("Net: receive failed: {}", Debug2Format(&e));
                None
            }
            Poll::Pending => None,
        }
    }

    pub fn send(&mut self, data: &[u8], to: IpEndpoint) {
        match poll_once(self.socket.send_to(data, to)) {
            Poll::Ready(Ok(())) => {}
            Poll::Ready(Err(e)) => warn!("Net: send failed: {}", Debug2Format(&e)),
            Poll::Pending => warn!("Net: tx buffer full, dropping {} bytes", data.len()),
        }
    }

    /// Antwort an den Absender des letzten Datagrams
    pub fn reply(&mut self, data: &[u8]) {
        match self.peer {
            Some(peer) => self.send(data, peer),
            None => warn!("Net: reply without request"),
        }
    }
}
