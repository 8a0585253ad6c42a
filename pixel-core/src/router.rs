//! Universe/Port Router
//!
//! Berechnet einmal beim Start die Zuordnung Protokoll-Universum →
//! (Port, Slot). Der Protokoll-Knoten schlägt darin jedes eingehende
//! Universum nach.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::types::{MAX_PORTS, MAX_PROTOCOL_PORTS, MAX_UNIVERSES_PER_PORT};

/// Wie weit der Protokoll-Port-Cursor pro physischem Port springt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotStride {
    /// Immer um das Hardware-Maximum (Art-Net)
    HardwareAligned,
    /// Um die tatsächliche Slot-Anzahl (E1.31)
    Packed,
}

impl SlotStride {
    pub fn width(self, slots: usize) -> usize {
        match self {
            SlotStride::HardwareAligned => MAX_UNIVERSES_PER_PORT,
            SlotStride::Packed => slots.clamp(1, MAX_UNIVERSES_PER_PORT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingEntry {
    pub protocol_port: u8,
    pub universe: u16,
    pub port: u8,
    pub slot: u8,
}

/// Protokoll-Port-Index → (Port, Slot)
pub fn locate(index: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    (index / width, index % width)
}

/// Unveränderliche Universe-Map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseMap {
    entries: Vec<MappingEntry, MAX_PROTOCOL_PORTS>,
    width: usize,
    slots: usize,
}

impl UniverseMap {
    /// Baut die Map aus den Start-Universen der aktiven Ports
    ///
    /// `slots` ist die Anzahl Universen, die jeder Port aufnehmen kann.
    /// Ein Port ohne Start-Universum erzeugt keine Einträge, der Cursor
    /// springt trotzdem weiter.
    pub fn build(start_universes: &[Option<u16>], slots: usize, stride: SlotStride) -> Self {
        let slots = slots.min(MAX_UNIVERSES_PER_PORT);
        let width = stride.width(slots);
        let mut entries = Vec::new();

        for (port, start) in start_universes.iter().take(MAX_PORTS).enumerate() {
            let cursor = port * width;
            let Some(start) = *start else {
                debug!("Router: port {} disabled", port);
                continue;
            };

            for slot in 0..slots {
                // Überlauf des 16-Bit Universums: kein Eintrag
                let Some(universe) = u16::try_from(slot)
                    .ok()
                    .and_then(|slot| start.checked_add(slot))
                else {
                    break;
                };
                let entry = MappingEntry {
                    protocol_port: (cursor + slot) as u8,
                    universe,
                    port: port as u8,
                    slot: slot as u8,
                };
                // Kapazität reicht für MAX_PORTS * MAX_UNIVERSES_PER_PORT
                let _ = entries.push(entry);
            }
        }

        Self {
            entries,
            width,
            slots,
        }
    }

    /// Alle Einträge für ein Universum (ein Universum darf mehrere Ports speisen)
    pub fn lookup(&self, universe: u16) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.entries.iter().filter(move |e| e.universe == universe)
    }

    pub fn entry(&self, protocol_port: usize) -> Option<&MappingEntry> {
        self.entries
            .iter()
            .find(|e| usize::from(e.protocol_port) == protocol_port)
    }

    pub fn locate(&self, protocol_port: usize) -> (usize, usize) {
        locate(protocol_port, self.width)
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn universes_for_port(&self, port: usize) -> impl Iterator<Item = u16> + '_ {
        self.entries
            .iter()
            .filter(move |e| usize::from(e.port) == port)
            .map(|e| e.universe)
    }

    /// Cursor-Schrittweite pro Port
    pub fn stride(&self) -> usize {
        self.width
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec as StdVec;

    fn universes(map: &UniverseMap, port: usize) -> StdVec<u16> {
        map.universes_for_port(port).collect()
    }

    #[test]
    fn test_partially_configured_ports() {
        let starts = [Some(1), None, Some(9), Some(13)];
        let map = UniverseMap::build(&starts, 4, SlotStride::HardwareAligned);

        assert_eq!(universes(&map, 0), [1, 2, 3, 4]);
        assert!(universes(&map, 1).is_empty());
        assert_eq!(universes(&map, 2), [9, 10, 11, 12]);
        assert_eq!(universes(&map, 3), [13, 14, 15, 16]);
        assert_eq!(map.entries().len(), 12);

        let hit: StdVec<_> = map.lookup(10).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!((hit[0].port, hit[0].slot), (2, 1));
        assert_eq!(map.lookup(5).count(), 0);
    }

    #[test]
    fn test_aligned_cursor_skips_unused_slots() {
        let starts = [Some(1), Some(100)];
        let map = UniverseMap::build(&starts, 2, SlotStride::HardwareAligned);

        let second = map.lookup(100).next().unwrap();
        assert_eq!(second.protocol_port, 4);
        assert_eq!(map.locate(4), (1, 0));
        assert_eq!(map.locate(5), (1, 1));
        assert!(map.entry(2).is_none());
    }

    #[test]
    fn test_packed_cursor() {
        let starts = [Some(1), None, Some(20)];
        let map = UniverseMap::build(&starts, 2, SlotStride::Packed);

        assert_eq!(map.stride(), 2);
        let third = map.lookup(20).next().unwrap();
        assert_eq!(third.protocol_port, 4);
        assert_eq!(map.locate(5), (2, 1));
    }

    #[test]
    fn test_universe_overflow_emits_no_entry() {
        let starts = [Some(u16::MAX - 1)];
        let map = UniverseMap::build(&starts, 4, SlotStride::HardwareAligned);
        assert_eq!(universes(&map, 0), [u16::MAX - 1, u16::MAX]);
    }

    #[test]
    fn test_zero_ports_gives_empty_map() {
        let map = UniverseMap::build(&[], 4, SlotStride::HardwareAligned);
        assert!(map.is_empty());
    }

    #[test]
    fn test_slots_clamped_to_hardware_maximum() {
        let map = UniverseMap::build(&[Some(1)], 9, SlotStride::Packed);
        assert_eq!(map.slots(), MAX_UNIVERSES_PER_PORT);
        assert_eq!(map.entries().len(), MAX_UNIVERSES_PER_PORT);
    }
}
