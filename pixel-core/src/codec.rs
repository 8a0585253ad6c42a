//! Paket-Codec für Art-Net 4, E1.31 (sACN) und LLRP
//!
//! Nur die Felder, die der Node tatsächlich auswertet. Alle Decoder
//! arbeiten zero-copy auf dem Empfangspuffer.

use core::str;

use crate::types::{LlrpRequest, ProtocolEvent, Uid};

pub const ARTNET_PORT: u16 = 6454;
pub const E131_PORT: u16 = 5568;
pub const LLRP_PORT: u16 = 5569;

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const ACN_ID: &[u8; 12] = b"ASC-E1.17\0\0\0";

const OP_POLL: u16 = 0x2000;
const OP_POLL_REPLY: u16 = 0x2100;
const OP_DMX: u16 = 0x5000;
const OP_SYNC: u16 = 0x5200;
const OP_ADDRESS: u16 = 0x6000;

const ARTNET_VERSION: u16 = 14;
pub const ART_POLL_REPLY_LEN: usize = 239;

const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_ROOT_E131_EXTENDED: u32 = 0x0000_0008;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_E131_EXTENDED_SYNC: u32 = 0x0000_0001;
const E131_OPTION_PREVIEW: u8 = 0x80;
const E131_OPTION_TERMINATED: u8 = 0x40;
const E131_DATA_OFFSET: usize = 126;

const VECTOR_ROOT_LLRP: u32 = 0x0000_000A;
const VECTOR_LLRP_PROBE_REQUEST: u32 = 0x0000_0001;
const VECTOR_LLRP_PROBE_REPLY: u32 = 0x0000_0002;
const VECTOR_LLRP_RDM_CMD: u32 = 0x0000_0003;
const VECTOR_PROBE_REQUEST_DATA: u8 = 0x01;
const VECTOR_PROBE_REPLY_DATA: u8 = 0x01;
const LLRP_COMPONENT_NON_RDMNET: u8 = 0xFF;
pub const LLRP_PROBE_REPLY_LEN: usize = 85;

const RDM_START_CODE: u8 = 0xCC;
const RDM_SET_COMMAND: u8 = 0x30;
const PID_FACTORY_DEFAULTS: u16 = 0x0090;
const PID_DEVICE_LABEL: u16 = 0x0082;
const PID_IDENTIFY_DEVICE: u16 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    TooShort,
    BadHeader,
    Unsupported,
    /// Gültiges Paket, das nicht ausgegeben werden soll (Preview, Terminated)
    Ignored,
    BufferTooSmall,
}

fn be16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn be32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn uid_at(buf: &[u8], at: usize) -> Uid {
    Uid::from_bytes([
        buf[at],
        buf[at + 1],
        buf[at + 2],
        buf[at + 3],
        buf[at + 4],
        buf[at + 5],
    ])
}

/// NUL-terminierter Name, leer oder ungültig → `None`
fn name_field(field: &[u8]) -> Option<&str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    match str::from_utf8(&field[..end]) {
        Ok(name) if !name.is_empty() => Some(name),
        _ => None,
    }
}

fn copy_name(dst: &mut [u8], name: &str) {
    let len = name.len().min(dst.len() - 1);
    dst[..len].copy_from_slice(&name.as_bytes()[..len]);
}

// ============================================================================
// Art-Net
// ============================================================================

/// Dekodiert ein Art-Net Paket
pub fn decode_art_net(buf: &[u8]) -> Result<ProtocolEvent<'_>, CodecError> {
    if buf.len() < 12 {
        return Err(CodecError::TooShort);
    }
    if &buf[..8] != ARTNET_ID {
        return Err(CodecError::BadHeader);
    }

    match u16::from_le_bytes([buf[8], buf[9]]) {
        OP_DMX => {
            if buf.len() < 18 {
                return Err(CodecError::TooShort);
            }
            let universe = (u16::from(buf[15] & 0x7F) << 8) | u16::from(buf[14]);
            let length = usize::from(be16(buf, 16)).min(buf.len() - 18);
            Ok(ProtocolEvent::Dmx {
                universe,
                data: &buf[18..18 + length],
            })
        }
        OP_SYNC => Ok(ProtocolEvent::Sync),
        OP_POLL => Ok(ProtocolEvent::Poll),
        OP_ADDRESS => {
            if buf.len() < 96 {
                return Err(CodecError::TooShort);
            }
            Ok(ProtocolEvent::Address {
                short_name: name_field(&buf[14..32]),
                long_name: name_field(&buf[32..96]),
            })
        }
        _ => Err(CodecError::Unsupported),
    }
}

/// Eine ArtPollReply-Seite (bis zu 4 Protokoll-Ports)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReplyPage<'a> {
    /// 1-basiert
    pub bind_index: u8,
    pub short_name: &'a str,
    pub long_name: &'a str,
    pub report: &'a str,
    pub net: u8,
    pub sub: u8,
    /// Untere 4 Bit der Port-Adresse, `None` = Port unbenutzt
    pub sw_out: [Option<u8>; 4],
    pub uid: Option<Uid>,
}

/// Kodiert ArtPollReply; Netzwerkdaten kommen vom Transport
pub fn encode_art_poll_reply(
    page: &PollReplyPage<'_>,
    ip: [u8; 4],
    mac: [u8; 6],
    buf: &mut [u8],
) -> Result<usize, CodecError> {
    if buf.len() < ART_POLL_REPLY_LEN {
        return Err(CodecError::BufferTooSmall);
    }
    let buf = &mut buf[..ART_POLL_REPLY_LEN];
    buf.fill(0);

    buf[..8].copy_from_slice(ARTNET_ID);
    buf[8..10].copy_from_slice(&OP_POLL_REPLY.to_le_bytes());
    buf[10..14].copy_from_slice(&ip);
    buf[14..16].copy_from_slice(&ARTNET_PORT.to_le_bytes());
    buf[16..18].copy_from_slice(&ARTNET_VERSION.to_be_bytes());
    buf[18] = page.net;
    buf[19] = page.sub;
    // Status1: Indikatoren normal, Port-Adressen per Netzwerk
    buf[23] = 0xD0;
    if let Some(uid) = page.uid {
        buf[24..26].copy_from_slice(&uid.manufacturer.to_le_bytes());
    }
    copy_name(&mut buf[26..44], page.short_name);
    copy_name(&mut buf[44..108], page.long_name);
    copy_name(&mut buf[108..172], page.report);

    let ports = page.sw_out.iter().filter(|p| p.is_some()).count() as u16;
    buf[172..174].copy_from_slice(&ports.to_be_bytes());
    for (i, sw_out) in page.sw_out.iter().enumerate() {
        if let Some(address) = sw_out {
            // Ausgang, DMX512
            buf[174 + i] = 0x80;
            buf[182 + i] = 0x80;
            buf[190 + i] = address & 0x0F;
        }
    }

    // Style: StNode
    buf[200] = 0x00;
    buf[201..207].copy_from_slice(&mac);
    buf[207..211].copy_from_slice(&ip);
    buf[211] = page.bind_index;
    // Status2: DHCP-fähig, 15-Bit Port-Adressen, sACN umschaltbar
    buf[212] = 0x0E;
    if let Some(uid) = page.uid {
        buf[218..224].copy_from_slice(&uid.to_bytes());
    }

    Ok(ART_POLL_REPLY_LEN)
}

// ============================================================================
// E1.31
// ============================================================================

/// Dekodiert ein E1.31 Daten- oder Sync-Paket
pub fn decode_e131(buf: &[u8]) -> Result<ProtocolEvent<'_>, CodecError> {
    if buf.len() < 49 {
        return Err(CodecError::TooShort);
    }
    if be16(buf, 0) != 0x0010 || &buf[4..16] != ACN_ID {
        return Err(CodecError::BadHeader);
    }

    match be32(buf, 18) {
        VECTOR_ROOT_E131_DATA => {
            if buf.len() < E131_DATA_OFFSET || be32(buf, 40) != VECTOR_E131_DATA_PACKET {
                return Err(CodecError::BadHeader);
            }
            let options = buf[112];
            if options & (E131_OPTION_PREVIEW | E131_OPTION_TERMINATED) != 0 {
                return Err(CodecError::Ignored);
            }
            if buf[125] != 0x00 {
                return Err(CodecError::Ignored);
            }
            let universe = be16(buf, 113);
            let count = usize::from(be16(buf, 123)).saturating_sub(1);
            let end = (E131_DATA_OFFSET + count).min(buf.len());
            Ok(ProtocolEvent::Dmx {
                universe,
                data: &buf[E131_DATA_OFFSET..end],
            })
        }
        VECTOR_ROOT_E131_EXTENDED => match be32(buf, 40) {
            VECTOR_E131_EXTENDED_SYNC => Ok(ProtocolEvent::Sync),
            _ => Err(CodecError::Unsupported),
        },
        _ => Err(CodecError::Unsupported),
    }
}

/// Multicast-Gruppe eines E1.31 Universums (239.255.hi.lo)
pub fn e131_multicast_group(universe: u16) -> [u8; 4] {
    let [hi, lo] = universe.to_be_bytes();
    [239, 255, hi, lo]
}

// ============================================================================
// LLRP (E1.33)
// ============================================================================

/// Dekodiertes LLRP-Paket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlrpPacket<'a> {
    pub sender_cid: [u8; 16],
    pub transaction: u32,
    pub request: LlrpRequest<'a>,
}

/// 24-Bit Flags+Length Feld
fn put_flags_length(buf: &mut [u8], at: usize, length: usize) {
    buf[at] = 0xF0 | ((length >> 16) as u8 & 0x0F);
    buf[at + 1] = (length >> 8) as u8;
    buf[at + 2] = length as u8;
}

pub fn decode_llrp(buf: &[u8]) -> Result<LlrpPacket<'_>, CodecError> {
    if buf.len() < 70 {
        return Err(CodecError::TooShort);
    }
    if be16(buf, 0) != 0x0010 || &buf[4..16] != ACN_ID {
        return Err(CodecError::BadHeader);
    }
    if be32(buf, 19) != VECTOR_ROOT_LLRP {
        return Err(CodecError::Unsupported);
    }

    let mut sender_cid = [0u8; 16];
    sender_cid.copy_from_slice(&buf[23..39]);
    let transaction = be32(buf, 62);

    let request = match be32(buf, 42) {
        VECTOR_LLRP_PROBE_REQUEST => {
            if buf.len() < 82 || buf[69] != VECTOR_PROBE_REQUEST_DATA {
                return Err(CodecError::TooShort);
            }
            LlrpRequest::Probe {
                lower: uid_at(buf, 70),
                upper: uid_at(buf, 76),
            }
        }
        VECTOR_LLRP_RDM_CMD => decode_rdm_set(&buf[69..])?,
        _ => return Err(CodecError::Unsupported),
    };

    Ok(LlrpPacket {
        sender_cid,
        transaction,
        request,
    })
}

/// RDM SET_COMMAND ohne Start-Code-Präfix der Transportschicht
fn decode_rdm_set(rdm: &[u8]) -> Result<LlrpRequest<'_>, CodecError> {
    if rdm.len() < 24 {
        return Err(CodecError::TooShort);
    }
    if rdm[0] != RDM_START_CODE || rdm[20] != RDM_SET_COMMAND {
        return Err(CodecError::Unsupported);
    }
    let pdl = usize::from(rdm[23]);
    let data = rdm.get(24..24 + pdl).ok_or(CodecError::TooShort)?;

    match be16(rdm, 21) {
        PID_IDENTIFY_DEVICE => Ok(LlrpRequest::Identify(data.first() == Some(&1))),
        PID_DEVICE_LABEL => str::from_utf8(data)
            .map(LlrpRequest::SetLabel)
            .map_err(|_| CodecError::BadHeader),
        PID_FACTORY_DEFAULTS => Ok(LlrpRequest::FactoryDefaults),
        _ => Err(CodecError::Unsupported),
    }
}

/// Kodiert eine LLRP Probe Reply
pub fn encode_llrp_probe_reply(
    own_cid: &[u8; 16],
    dest_cid: &[u8; 16],
    transaction: u32,
    uid: Uid,
    mac: [u8; 6],
    buf: &mut [u8],
) -> Result<usize, CodecError> {
    if buf.len() < LLRP_PROBE_REPLY_LEN {
        return Err(CodecError::BufferTooSmall);
    }
    let buf = &mut buf[..LLRP_PROBE_REPLY_LEN];
    buf.fill(0);

    // Root Layer
    buf[..2].copy_from_slice(&0x0010u16.to_be_bytes());
    buf[4..16].copy_from_slice(ACN_ID);
    put_flags_length(buf, 16, LLRP_PROBE_REPLY_LEN - 16);
    buf[19..23].copy_from_slice(&VECTOR_ROOT_LLRP.to_be_bytes());
    buf[23..39].copy_from_slice(own_cid);

    // LLRP PDU
    put_flags_length(buf, 39, LLRP_PROBE_REPLY_LEN - 39);
    buf[42..46].copy_from_slice(&VECTOR_LLRP_PROBE_REPLY.to_be_bytes());
    buf[46..62].copy_from_slice(dest_cid);
    buf[62..66].copy_from_slice(&transaction.to_be_bytes());

    // Probe Reply PDU
    put_flags_length(buf, 66, LLRP_PROBE_REPLY_LEN - 66);
    buf[69] = VECTOR_PROBE_REPLY_DATA;
    buf[70..76].copy_from_slice(&uid.to_bytes());
    buf[76..82].copy_from_slice(&mac);
    buf[82] = LLRP_COMPONENT_NON_RDMNET;

    Ok(LLRP_PROBE_REPLY_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec;
    use std::vec::Vec;

    fn art_dmx(net: u8, subuni: u8, data: &[u8]) -> Vec<u8> {
        let mut p = Vec::from(&ARTNET_ID[..]);
        p.extend_from_slice(&OP_DMX.to_le_bytes());
        p.extend_from_slice(&ARTNET_VERSION.to_be_bytes());
        p.extend_from_slice(&[0, 0, subuni, net]);
        p.extend_from_slice(&(data.len() as u16).to_be_bytes());
        p.extend_from_slice(data);
        p
    }

    #[test]
    fn test_art_dmx() {
        let packet = art_dmx(0x01, 0x23, &[1, 2, 3]);
        assert_eq!(
            decode_art_net(&packet),
            Ok(ProtocolEvent::Dmx {
                universe: 0x0123,
                data: &[1, 2, 3]
            })
        );
    }

    #[test]
    fn test_art_dmx_length_clamped_to_packet() {
        let mut packet = art_dmx(0, 1, &[9, 9]);
        packet[16..18].copy_from_slice(&512u16.to_be_bytes());
        match decode_art_net(&packet) {
            Ok(ProtocolEvent::Dmx { data, .. }) => assert_eq!(data, &[9, 9]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_art_address_names() {
        let mut packet = vec![0u8; 107];
        packet[..8].copy_from_slice(ARTNET_ID);
        packet[8..10].copy_from_slice(&OP_ADDRESS.to_le_bytes());
        packet[14..19].copy_from_slice(b"Stage");
        assert_eq!(
            decode_art_net(&packet),
            Ok(ProtocolEvent::Address {
                short_name: Some("Stage"),
                long_name: None
            })
        );
    }

    #[test]
    fn test_art_bad_header() {
        assert_eq!(decode_art_net(b"Art-Nat\0\0\x50\0\x0e"), Err(CodecError::BadHeader));
        assert_eq!(decode_art_net(b"Art"), Err(CodecError::TooShort));
    }

    #[test]
    fn test_poll_reply_layout() {
        let page = PollReplyPage {
            bind_index: 2,
            short_name: "Pixel",
            long_name: "Art-Net Pixel 1-WS2812B:170",
            report: "#0001 [0000] OK",
            net: 0,
            sub: 1,
            sw_out: [Some(4), Some(5), None, None],
            uid: Some(Uid::new(0x7FF0, 0x0102_0304)),
        };
        let mut buf = [0u8; 300];
        let len = encode_art_poll_reply(&page, [10, 0, 0, 2], [1, 2, 3, 4, 5, 6], &mut buf).unwrap();

        assert_eq!(len, ART_POLL_REPLY_LEN);
        assert_eq!(&buf[8..10], &[0x00, 0x21]);
        assert_eq!(&buf[10..14], &[10, 0, 0, 2]);
        assert_eq!(&buf[26..31], b"Pixel");
        assert_eq!(&buf[172..174], &[0, 2]);
        assert_eq!(&buf[190..194], &[4, 5, 0, 0]);
        assert_eq!(&buf[201..207], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf[211], 2);
        assert_eq!(&buf[218..224], &[0x7F, 0xF0, 1, 2, 3, 4]);
    }

    fn e131(universe: u16, options: u8, data: &[u8]) -> Vec<u8> {
        let mut p = vec![0u8; E131_DATA_OFFSET];
        p[0..2].copy_from_slice(&0x0010u16.to_be_bytes());
        p[4..16].copy_from_slice(ACN_ID);
        p[18..22].copy_from_slice(&VECTOR_ROOT_E131_DATA.to_be_bytes());
        p[40..44].copy_from_slice(&VECTOR_E131_DATA_PACKET.to_be_bytes());
        p[112] = options;
        p[113..115].copy_from_slice(&universe.to_be_bytes());
        p[123..125].copy_from_slice(&((data.len() + 1) as u16).to_be_bytes());
        p.extend_from_slice(data);
        p
    }

    #[test]
    fn test_e131_data() {
        let packet = e131(7, 0, &[10, 20]);
        assert_eq!(
            decode_e131(&packet),
            Ok(ProtocolEvent::Dmx {
                universe: 7,
                data: &[10, 20]
            })
        );
    }

    #[test]
    fn test_e131_preview_ignored() {
        let packet = e131(7, E131_OPTION_PREVIEW, &[1]);
        assert_eq!(decode_e131(&packet), Err(CodecError::Ignored));
    }

    #[test]
    fn test_e131_multicast_group() {
        assert_eq!(e131_multicast_group(0x0102), [239, 255, 1, 2]);
    }

    fn llrp(vector: u32) -> Vec<u8> {
        let mut p = vec![0u8; 69];
        p[0..2].copy_from_slice(&0x0010u16.to_be_bytes());
        p[4..16].copy_from_slice(ACN_ID);
        p[19..23].copy_from_slice(&VECTOR_ROOT_LLRP.to_be_bytes());
        p[23..39].copy_from_slice(&[0xAB; 16]);
        p[42..46].copy_from_slice(&vector.to_be_bytes());
        p[62..66].copy_from_slice(&42u32.to_be_bytes());
        p
    }

    #[test]
    fn test_llrp_probe_request() {
        let mut packet = llrp(VECTOR_LLRP_PROBE_REQUEST);
        packet.push(VECTOR_PROBE_REQUEST_DATA);
        packet.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        packet.extend_from_slice(&[0xFF; 6]);
        packet.extend_from_slice(&[0, 0]);

        let decoded = decode_llrp(&packet).unwrap();
        assert_eq!(decoded.sender_cid, [0xAB; 16]);
        assert_eq!(decoded.transaction, 42);
        assert_eq!(
            decoded.request,
            LlrpRequest::Probe {
                lower: Uid::new(0, 0),
                upper: Uid::new(0xFFFF, 0xFFFF_FFFF)
            }
        );
    }

    #[test]
    fn test_llrp_set_label() {
        let mut packet = llrp(VECTOR_LLRP_RDM_CMD);
        let mut rdm = vec![0u8; 24];
        rdm[0] = RDM_START_CODE;
        rdm[20] = RDM_SET_COMMAND;
        rdm[21..23].copy_from_slice(&PID_DEVICE_LABEL.to_be_bytes());
        rdm[23] = 4;
        rdm.extend_from_slice(b"Left");
        packet.extend_from_slice(&rdm);

        assert_eq!(
            decode_llrp(&packet).unwrap().request,
            LlrpRequest::SetLabel("Left")
        );
    }

    #[test]
    fn test_llrp_probe_reply() {
        let mut buf = [0u8; 128];
        let uid = Uid::new(0x7FF0, 9);
        let len =
            encode_llrp_probe_reply(&[1; 16], &[2; 16], 7, uid, [6; 6], &mut buf).unwrap();
        assert_eq!(len, LLRP_PROBE_REPLY_LEN);
        assert_eq!(&buf[46..62], &[2; 16]);
        assert_eq!(&buf[62..66], &7u32.to_be_bytes());
        assert_eq!(&buf[70..76], &uid.to_bytes());
        assert_eq!(buf[82], LLRP_COMPONENT_NON_RDMNET);
    }
}
