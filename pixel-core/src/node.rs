//! Protocol Node (Art-Net Node / E1.31 Bridge)
//!
//! Nimmt Ereignisse vom Protokoll-Transport entgegen, schlägt das
//! Universum in der Port-Tabelle nach und schreibt die Kanaldaten in das
//! Output Device. Ohne Output Device (Testmuster aktiv) werden nur
//! Steuerpakete (Poll, Address) bedient.

use core::fmt::Write as _;
use core::ops::RangeInclusive;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::codec::PollReplyPage;
use crate::output::OutputDevice;
use crate::router::{SlotStride, UniverseMap, locate};
use crate::traits::{NodeStore, ProtocolTransport};
use crate::types::{MAX_PROTOCOL_PORTS, PortDir, ProtocolEvent, Uid, truncated};

/// Nach dieser Zeit ohne OpSync wird wieder sofort gerendert
pub const SYNC_TIMEOUT_MS: u64 = 4_000;

/// Nach dieser Zeit ohne DMX greift das Failsafe-Verhalten
pub const DATA_LOSS_TIMEOUT_MS: u64 = 10_000;

/// Obergrenze pro `run()`, damit ein Paketsturm den Tick nicht sprengt
const MAX_EVENTS_PER_RUN: usize = 8;

const PORTS_PER_PAGE: usize = 4;

pub type ShortName = String<18>;
pub type LongName = String<64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    ArtNet,
    E131,
}

impl Protocol {
    pub fn universe_range(self) -> RangeInclusive<u16> {
        match self {
            Protocol::ArtNet => 0..=32767,
            Protocol::E131 => 1..=63999,
        }
    }

    pub fn default_stride(self) -> SlotStride {
        match self {
            Protocol::ArtNet => SlotStride::HardwareAligned,
            Protocol::E131 => SlotStride::Packed,
        }
    }

    pub fn answers_poll(self) -> bool {
        matches!(self, Protocol::ArtNet)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Protocol::ArtNet => "Art-Net",
            Protocol::E131 => "sACN",
        }
    }
}

/// Verhalten bei Verlust des Datenstroms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failsafe {
    /// Letzten Zustand halten
    Hold,
    /// Ausgänge abschalten
    Off,
}

/// Momentaufnahme für Display und Status-LED
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeStatus {
    pub started: bool,
    pub frames: u32,
    pub dropped: u32,
    pub data_loss: bool,
    pub synchronous: bool,
    pub test_pattern: bool,
    pub identify: bool,
}

impl NodeStatus {
    pub fn receiving(&self) -> bool {
        self.frames > 0 && !self.data_loss
    }
}

pub struct LightNode<O> {
    protocol: Protocol,
    stride: SlotStride,
    width: usize,
    universes: [Option<u16>; MAX_PROTOCOL_PORTS],
    output: Option<O>,
    uid: Option<Uid>,
    short_name: ShortName,
    long_name: LongName,
    failsafe: Failsafe,
    started: bool,
    pending: bool,
    poll_pending: bool,
    synchronous: bool,
    last_sync_ms: u64,
    last_dmx_ms: Option<u64>,
    data_loss: bool,
    frames: u32,
    dropped: u32,
}

impl<O: OutputDevice> LightNode<O> {
    pub fn new(protocol: Protocol) -> Self {
        let mut short_name = ShortName::new();
        let _ = short_name.push_str("Pixel Node");
        let mut long_name = LongName::new();
        let _ = write!(long_name, "{} Pixel Node", protocol.name());

        Self {
            protocol,
            stride: protocol.default_stride(),
            width: 1,
            universes: [None; MAX_PROTOCOL_PORTS],
            output: None,
            uid: None,
            short_name,
            long_name,
            failsafe: Failsafe::Hold,
            started: false,
            pending: false,
            poll_pending: false,
            synchronous: false,
            last_sync_ms: 0,
            last_dmx_ms: None,
            data_loss: false,
            frames: 0,
            dropped: 0,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Installiert das Output Device; `None` = keine Pixel rendern.
    ///
    /// Gibt ein zuvor installiertes Device zurück, damit es genau einen
    /// Besitzer behält.
    pub fn set_output(&mut self, output: Option<O>) -> Option<O> {
        core::mem::replace(&mut self.output, output)
    }

    pub fn output(&self) -> Option<&O> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut O> {
        self.output.as_mut()
    }

    pub fn slot_stride(&self) -> SlotStride {
        self.stride
    }

    pub fn set_slot_stride(&mut self, stride: SlotStride) {
        self.stride = stride;
    }

    /// Weist einem Protokoll-Port ein Universum zu
    pub fn set_universe(&mut self, index: usize, dir: PortDir, universe: u16) -> bool {
        let Some(slot) = self.universes.get_mut(index) else {
            warn!("Node: protocol port {} out of range", index);
            return false;
        };
        match dir {
            PortDir::Disable => {
                *slot = None;
                true
            }
            PortDir::Output if self.protocol.universe_range().contains(&universe) => {
                *slot = Some(universe);
                true
            }
            PortDir::Output => {
                warn!("Node: universe {} outside protocol range", universe);
                false
            }
        }
    }

    pub fn universe(&self, index: usize) -> Option<u16> {
        self.universes.get(index).copied().flatten()
    }

    /// Übernimmt alle Einträge der Router-Map
    pub fn apply_map(&mut self, map: &UniverseMap) {
        self.width = map.stride();
        for entry in map.entries() {
            self.set_universe(
                usize::from(entry.protocol_port),
                PortDir::Output,
                entry.universe,
            );
        }
    }

    pub fn active_output_ports(&self) -> usize {
        self.universes.iter().filter(|u| u.is_some()).count()
    }

    pub fn set_rdm_uid(&mut self, uid: Uid) {
        self.uid = Some(uid);
    }

    pub fn rdm_uid(&self) -> Option<Uid> {
        self.uid
    }

    pub fn set_short_name(&mut self, name: &str) {
        self.short_name = truncated(name);
    }

    pub fn set_long_name(&mut self, name: &str) {
        self.long_name = truncated(name);
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn set_failsafe(&mut self, failsafe: Failsafe) {
        self.failsafe = failsafe;
    }

    pub fn failsafe(&self) -> Failsafe {
        self.failsafe
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Konfiguriert → aktiv
    pub fn start<T: ProtocolTransport>(&mut self, transport: &mut T) {
        for universe in self.universes.iter().flatten() {
            transport.join(*universe);
        }
        self.started = true;
        info!(
            "Node: {} started, {} output ports",
            self.protocol.name(),
            self.active_output_ports()
        );
    }

    /// Ein nicht-blockierender Service-Durchlauf
    pub fn run<T, S>(&mut self, now_ms: u64, transport: &mut T, store: &mut S)
    where
        T: ProtocolTransport,
        S: NodeStore,
    {
        if !self.started {
            return;
        }

        for _ in 0..MAX_EVENTS_PER_RUN {
            let Some(event) = transport.receive() else {
                break;
            };
            self.handle(now_ms, event, store);
        }

        if self.poll_pending {
            self.poll_pending = false;
            if self.protocol.answers_poll() {
                self.send_poll_replies(transport);
            }
        }

        if self.synchronous && now_ms.saturating_sub(self.last_sync_ms) > SYNC_TIMEOUT_MS {
            info!("Node: sync timeout, back to immediate mode");
            self.synchronous = false;
        }

        if self.pending && !self.synchronous {
            self.render();
        }

        self.check_data_loss(now_ms);
    }

    fn handle<S: NodeStore>(&mut self, now_ms: u64, event: ProtocolEvent<'_>, store: &mut S) {
        match event {
            ProtocolEvent::Dmx { universe, data } => self.handle_dmx(now_ms, universe, data),
            ProtocolEvent::Sync => {
                self.synchronous = true;
                self.last_sync_ms = now_ms;
                if self.pending {
                    self.render();
                }
            }
            ProtocolEvent::Poll => self.poll_pending = true,
            ProtocolEvent::Address {
                short_name,
                long_name,
            } => {
                if let Some(name) = short_name {
                    self.set_short_name(name);
                    store.save_short_name(&self.short_name);
                }
                if let Some(name) = long_name {
                    self.set_long_name(name);
                    store.save_long_name(&self.long_name);
                }
            }
        }
    }

    fn handle_dmx(&mut self, now_ms: u64, universe: u16, data: &[u8]) {
        if !self.protocol.universe_range().contains(&universe) {
            self.dropped = self.dropped.wrapping_add(1);
            return;
        }
        self.frames = self.frames.wrapping_add(1);
        self.last_dmx_ms = Some(now_ms);
        if self.data_loss {
            info!("Node: data restored");
            self.data_loss = false;
        }

        let Some(output) = self.output.as_mut() else {
            return;
        };
        for (index, _) in self
            .universes
            .iter()
            .enumerate()
            .filter(|(_, u)| **u == Some(universe))
        {
            let (port, slot) = locate(index, self.width);
            output.write(port, slot, data);
            self.pending = true;
        }
    }

    fn render(&mut self) {
        if let Some(output) = self.output.as_mut() {
            if output.render() {
                self.pending = false;
            }
        } else {
            self.pending = false;
        }
    }

    fn check_data_loss(&mut self, now_ms: u64) {
        let Some(last) = self.last_dmx_ms else {
            return;
        };
        if self.data_loss || now_ms.saturating_sub(last) <= DATA_LOSS_TIMEOUT_MS {
            return;
        }
        warn!("Node: data loss");
        self.data_loss = true;
        if self.failsafe == Failsafe::Off {
            if let Some(output) = self.output.as_mut() {
                output.blackout();
            }
        }
    }

    fn send_poll_replies<T: ProtocolTransport>(&self, transport: &mut T) {
        let report = self.report();
        let mut sent = false;

        for (page_index, page) in self.universes.chunks(PORTS_PER_PAGE).enumerate() {
            let Some(first) = page.iter().flatten().next() else {
                continue;
            };
            let net = ((first >> 8) & 0x7F) as u8;
            let sub = ((first >> 4) & 0x0F) as u8;
            let mut sw_out = [None; PORTS_PER_PAGE];
            for (i, universe) in page.iter().enumerate() {
                if let Some(u) = universe {
                    // Eine ArtPollReply-Seite trägt nur ein Net/Sub-Net. Ports
                    // dahinter (z.B. 16 nach 13..15) empfangen weiter DMX,
                    // werden aber von Controllern nicht entdeckt.
                    if (u >> 4) == (first >> 4) {
                        sw_out[i] = Some((u & 0x0F) as u8);
                    }
                }
            }
            transport.send_poll_reply(&self.page(page_index as u8 + 1, net, sub, sw_out, &report));
            sent = true;
        }

        if !sent {
            transport.send_poll_reply(&self.page(1, 0, 0, [None; PORTS_PER_PAGE], &report));
        }
    }

    fn page<'a>(
        &'a self,
        bind_index: u8,
        net: u8,
        sub: u8,
        sw_out: [Option<u8>; PORTS_PER_PAGE],
        report: &'a str,
    ) -> PollReplyPage<'a> {
        PollReplyPage {
            bind_index,
            short_name: &self.short_name,
            long_name: &self.long_name,
            report,
            net,
            sub,
            sw_out,
            uid: self.uid,
        }
    }

    fn report(&self) -> String<64> {
        let mut report = String::new();
        let state = if self.data_loss { "Data loss" } else { "OK" };
        let _ = write!(report, "#0001 [{:04}] {}", self.frames % 10_000, state);
        report
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            started: self.started,
            frames: self.frames,
            dropped: self.dropped,
            data_loss: self.data_loss,
            synchronous: self.synchronous,
            test_pattern: false,
            identify: false,
        }
    }

    pub fn print(&self) {
        info!(
            "Node: {} short='{}' long='{}'",
            self.protocol.name(),
            self.short_name.as_str(),
            self.long_name.as_str()
        );
        for (index, universe) in self.universes.iter().enumerate() {
            if let Some(universe) = universe {
                let (port, slot) = locate(index, self.width);
                info!("Node: port {}:{} universe {}", port, slot, universe);
            }
        }
    }
}
