//! Integration Tests für Universe-Map und Routing bis zum Pixel-Buffer

mod common;

use common::{MockPixelDriver, MockTransport, Packet, new_log};
use pixel_core::router::MappingEntry;
use pixel_core::traits::NodeStore;
use pixel_core::{
    LightNode, OutputDevice, PixelConfiguration, PixelOutput, Protocol, SlotStride, UniverseMap,
};

#[derive(Default)]
struct NoStore;

impl NodeStore for NoStore {
    fn save_short_name(&mut self, _name: &str) {}
    fn save_long_name(&mut self, _name: &str) {}
}

fn starts() -> [Option<u16>; 4] {
    [Some(1), None, Some(9), Some(13)]
}

// ============================================================================
// Tests: Map-Eigenschaften
// ============================================================================

#[test]
fn test_every_entry_is_in_bounds() {
    for stride in [SlotStride::HardwareAligned, SlotStride::Packed] {
        for slots in 1..=4 {
            let map = UniverseMap::build(&starts(), slots, stride);
            for entry in map.entries() {
                assert!(usize::from(entry.port) < 4);
                assert!(usize::from(entry.slot) < slots);
                assert_eq!(
                    map.locate(usize::from(entry.protocol_port)),
                    (usize::from(entry.port), usize::from(entry.slot))
                );
            }
        }
    }
}

#[test]
fn test_slot_universes_are_consecutive() {
    let map = UniverseMap::build(&starts(), 4, SlotStride::HardwareAligned);
    let port2: Vec<u16> = map.universes_for_port(2).collect();
    assert_eq!(port2, [9, 10, 11, 12]);
    assert_eq!(map.universes_for_port(1).count(), 0);
}

#[test]
fn test_overlapping_ports_share_universe() {
    let map = UniverseMap::build(&[Some(1), Some(2)], 2, SlotStride::Packed);
    let hits: Vec<&MappingEntry> = map.lookup(2).collect();
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].port, hits[0].slot), (0, 1));
    assert_eq!((hits[1].port, hits[1].slot), (1, 0));
}

// ============================================================================
// Tests: Ende-zu-Ende (Map → Node → Output)
// ============================================================================

#[test]
fn test_universe_routed_to_port_and_slot() {
    let log = new_log();
    let config = PixelConfiguration {
        count: 680,
        active_ports: 4,
        ..Default::default()
    };
    let output = PixelOutput::new(MockPixelDriver::new(log), config).unwrap();
    assert_eq!(output.universes(), 4);

    let map = UniverseMap::build(&starts(), output.universes(), SlotStride::HardwareAligned);
    let mut node = LightNode::new(Protocol::ArtNet);
    node.apply_map(&map);
    node.set_output(Some(output));

    let mut transport = MockTransport::default();
    node.start(&mut transport);

    transport.queue.push_back(Packet::Dmx(10, vec![0xAB; 6]));
    transport.queue.push_back(Packet::Dmx(5, vec![0xCD; 6]));
    node.run(100, &mut transport, &mut NoStore);

    let output = node.output().unwrap();
    let footprint = 170 * 3;
    // Universum 10 = Port 2, Slot 1
    let port2 = output.buffer(2).unwrap();
    assert_eq!(&port2[footprint..footprint + 6], &[0xAB; 6]);
    assert!(port2[..footprint].iter().all(|&b| b == 0));

    // Universum 5 gehört zu Port 1 (nicht konfiguriert) und wird verworfen
    for port in 0..4 {
        assert!(!output.buffer(port).unwrap().contains(&0xCD));
    }

    let frames = &output.driver().frames;
    assert!(frames[2].is_some());
    assert!(frames[0].is_none());
    assert!(frames[1].is_none());
}

#[test]
fn test_e131_joins_every_mapped_universe() {
    let map = UniverseMap::build(&starts(), 2, SlotStride::Packed);
    let mut node: LightNode<PixelOutput<MockPixelDriver>> = LightNode::new(Protocol::E131);
    node.apply_map(&map);

    let mut transport = MockTransport::default();
    node.start(&mut transport);

    let mut joined = transport.joined.clone();
    joined.sort_unstable();
    assert_eq!(joined, [1, 2, 9, 10, 13, 14]);
}
