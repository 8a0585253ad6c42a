// Protokoll-Transporte: Art-Net / E1.31, LLRP, Remote-Config
//
// Jeder Transport besitzt seinen Socket und einen Frame-Buffer. Vor
// `attach` (Netzwerk noch nicht initialisiert) liefern alle `None`.

use defmt::{debug, warn};
use embassy_net::{IpEndpoint, Stack};
use pixel_core::codec::{
    ART_POLL_REPLY_LEN, ARTNET_PORT, CodecError, LLRP_PORT, LLRP_PROBE_REPLY_LEN, PollReplyPage,
    decode_art_net, decode_e131, decode_llrp, e131_multicast_group, encode_art_poll_reply,
    encode_llrp_probe_reply,
};
use pixel_core::types::{LlrpRequest, ProtocolEvent};
use pixel_core::{LlrpTransport, Protocol, ProtocolTransport, RemoteTransport, Uid};

use super::socket::{UdpPort, ipv4};
use crate::config::{ARTNET_BROADCAST, LLRP_RESPONSE_GROUP, UDP_FRAME_SIZE};

// ============================================================================
// Art-Net / E1.31
// ============================================================================

pub struct DmxTransport {
    protocol: Protocol,
    mac: [u8; 6],
    stack: Option<Stack<'static>>,
    port: Option<UdpPort>,
    frame: [u8; UDP_FRAME_SIZE],
}

impl DmxTransport {
    pub fn new(protocol: Protocol, mac: [u8; 6]) -> Self {
        Self {
            protocol,
            mac,
            stack: None,
            port: None,
            frame: [0; UDP_FRAME_SIZE],
        }
    }

    pub fn attach(&mut self, stack: Stack<'static>, port: UdpPort) {
        self.stack = Some(stack);
        self.port = Some(port);
    }

    fn decode(protocol: Protocol, data: &[u8]) -> Result<ProtocolEvent<'_>, CodecError> {
        match protocol {
            Protocol::ArtNet => decode_art_net(data),
            Protocol::E131 => decode_e131(data),
        }
    }
}

impl ProtocolTransport for DmxTransport {
    fn receive(&mut self) -> Option<ProtocolEvent<'_>> {
        let port = self.port.as_mut()?;

        // Nicht dekodierbare Datagramme überspringen
        let len = loop {
            let len = port.try_recv(&mut self.frame)?;
            match Self::decode(self.protocol, &self.frame[..len]) {
                Ok(_) => break len,
                Err(CodecError::Ignored) => {}
                Err(e) => debug!("ArtNet/E131: dropped datagram: {}", e),
            }
        };
        Self::decode(self.protocol, &self.frame[..len]).ok()
    }

    fn send_poll_reply(&mut self, page: &PollReplyPage<'_>) {
        let (Some(stack), Some(port)) = (self.stack, self.port.as_mut()) else {
            return;
        };
        // Ohne eigene Adresse keine Antwort
        let Some(config) = stack.config_v4() else {
            return;
        };
        let ip = config.address.address().octets();

        let mut buf = [0u8; ART_POLL_REPLY_LEN];
        match encode_art_poll_reply(page, ip, self.mac, &mut buf) {
            Ok(len) => port.send(
                &buf[..len],
                IpEndpoint::new(ipv4(ARTNET_BROADCAST), ARTNET_PORT),
            ),
            Err(e) => warn!("ArtNet: poll reply encode failed: {}", e),
        }
    }

    fn join(&mut self, universe: u16) {
        let Some(stack) = self.stack else {
            return;
        };
        let group = e131_multicast_group(universe);
        if let Err(e) = stack.join_multicast_group(ipv4(group)) {
            warn!(
                "E131: join of universe {} failed: {}",
                universe,
                defmt::Debug2Format(&e)
            );
        }
    }
}

// ============================================================================
// LLRP
// ============================================================================

pub struct LlrpSocket {
    cid: [u8; 16],
    mac: [u8; 6],
    port: Option<UdpPort>,
    /// Sender-CID und Transaktionsnummer der letzten Anfrage
    last: Option<([u8; 16], u32)>,
    frame: [u8; UDP_FRAME_SIZE],
}

impl LlrpSocket {
    pub fn new(mac: [u8; 6]) -> Self {
        // Stabile Component-ID aus der MAC
        let mut cid = *b"PixelNode\0\0\0\0\0\0\0";
        cid[10..].copy_from_slice(&mac);
        Self {
            cid,
            mac,
            port: None,
            last: None,
            frame: [0; UDP_FRAME_SIZE],
        }
    }

    pub fn attach(&mut self, port: UdpPort) {
        self.port = Some(port);
    }
}

impl LlrpTransport for LlrpSocket {
    fn receive(&mut self) -> Option<LlrpRequest<'_>> {
        let port = self.port.as_mut()?;

        let len = loop {
            let len = port.try_recv(&mut self.frame)?;
            match decode_llrp(&self.frame[..len]) {
                Ok(packet) => {
                    self.last = Some((packet.sender_cid, packet.transaction));
                    break len;
                }
                Err(e) => debug!("LLRP: dropped datagram: {}", e),
            }
        };
        decode_llrp(&self.frame[..len]).ok().map(|packet| packet.request)
    }

    fn send_probe_reply(&mut self, uid: Uid) {
        let (Some(port), Some((dest, transaction))) = (self.port.as_mut(), self.last) else {
            return;
        };

        let mut buf = [0u8; LLRP_PROBE_REPLY_LEN];
        match encode_llrp_probe_reply(&self.cid, &dest, transaction, uid, self.mac, &mut buf) {
            Ok(len) => port.send(
                &buf[..len],
                IpEndpoint::new(ipv4(LLRP_RESPONSE_GROUP), LLRP_PORT),
            ),
            Err(e) => warn!("LLRP: probe reply encode failed: {}", e),
        }
    }
}

// ============================================================================
// Remote-Config
// ============================================================================

#[derive(Default)]
pub struct RemoteSocket {
    port: Option<UdpPort>,
}

impl RemoteSocket {
    pub fn attach(&mut self, port: UdpPort) {
        self.port = Some(port);
    }
}

impl RemoteTransport for RemoteSocket {
    fn receive(&mut self, buf: &mut [u8]) -> Option<usize> {
        self.port.as_mut()?.try_recv(buf)
    }

    fn reply(&mut self, data: &[u8]) {
        if let Some(port) = self.port.as_mut() {
            port.reply(data);
        }
    }
}
