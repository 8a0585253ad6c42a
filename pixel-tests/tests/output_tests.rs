//! Integration Tests für Output Device und Strip Driver
//!
//! Diese Tests laufen auf dem Host (x86_64) und nutzen MockLedWriter

mod common;

use common::{MockLedWriter, MockPixelDriver, new_log};
use pixel_core::{
    LedError, OutputDevice, OutputError, PixelConfiguration, PixelMap, PixelOutput, PixelType,
    SmartLedWriter, StripDriver,
};
use rgb::RGB8;

fn strips(ports: usize) -> StripDriver<MockLedWriter> {
    StripDriver::new((0..ports).map(|_| MockLedWriter::new()), 680)
}

fn config(count: u16, ports: u8) -> PixelConfiguration {
    PixelConfiguration {
        count,
        active_ports: ports,
        ..Default::default()
    }
}

// ============================================================================
// Tests: MockLedWriter
// ============================================================================

#[test]
fn test_mock_led_writer_write() {
    let mut mock = MockLedWriter::new();
    let color = RGB8 { r: 10, g: 0, b: 0 };

    assert_eq!(mock.write_count, 0);
    assert_eq!(mock.last_frame, None);

    mock.write([color, color].into_iter()).unwrap();

    assert_eq!(mock.write_count, 1);
    assert_eq!(mock.last_frame, Some(vec![color, color]));
}

#[test]
fn test_mock_led_writer_recovers_after_fail() {
    let mut mock = MockLedWriter::new();
    mock.fail_next_write = true;

    let result = mock.write(std::iter::once(RGB8 { r: 10, g: 0, b: 0 }));
    assert_eq!(result, Err(LedError::WriteFailed));
    assert_eq!(mock.write_count, 0);

    let result = mock.write(std::iter::once(RGB8 { r: 0, g: 10, b: 0 }));
    assert!(result.is_ok());
    assert_eq!(mock.write_count, 1);
}

// ============================================================================
// Tests: PixelOutput über StripDriver
// ============================================================================

#[test]
fn test_universe_reaches_strip_in_wire_order() {
    // WS2812B ist GRB auf der Leitung
    let mut output = PixelOutput::new(strips(2), config(4, 2)).unwrap();
    output.write(1, 0, &[1, 2, 3, 4, 5, 6]);
    assert!(output.render());

    let driver = output.driver();
    assert_eq!(driver.writer(0).unwrap().write_count, 0);
    let frame = driver.writer(1).unwrap().last_frame.clone().unwrap();
    assert_eq!(frame.len(), 4);
    assert_eq!(frame[0], RGB8 { r: 2, g: 1, b: 3 });
    assert_eq!(frame[1], RGB8 { r: 5, g: 4, b: 6 });
    assert_eq!(frame[2], RGB8::default());
}

#[test]
fn test_explicit_map_overrides_type_default() {
    let mut cfg = config(1, 1);
    cfg.map = Some(PixelMap::BGR);
    let mut output = PixelOutput::new(strips(1), cfg).unwrap();
    output.write(0, 0, &[1, 2, 3]);
    output.render();

    let frame = output.driver().writer(0).unwrap().last_frame.clone().unwrap();
    assert_eq!(frame[0], RGB8 { r: 3, g: 2, b: 1 });
}

#[test]
fn test_second_universe_lands_behind_first() {
    let mut output = PixelOutput::new(strips(1), config(340, 1)).unwrap();
    assert_eq!(output.universes(), 2);
    output.write(0, 1, &[9, 8, 7]);
    output.render();

    let frame = output.driver().writer(0).unwrap().last_frame.clone().unwrap();
    assert_eq!(frame[170], RGB8 { r: 8, g: 9, b: 7 });
    assert_eq!(frame[169], RGB8::default());
}

#[test]
fn test_failed_strip_does_not_stop_other_ports() {
    let mut output = PixelOutput::new(strips(2), config(1, 2)).unwrap();
    output.driver_mut().writer_mut(0).unwrap().fail_next_write = true;
    output.write(0, 0, &[1, 1, 1]);
    output.write(1, 0, &[2, 2, 2]);
    assert!(output.render());
    assert!(!output.is_dirty());
    assert_eq!(output.driver().writer(0).unwrap().write_count, 0);
    assert_eq!(output.driver().writer(1).unwrap().write_count, 1);
}

#[test]
fn test_strip_driver_rejects_rgbw_and_excess_ports() {
    let mut cfg = config(10, 1);
    cfg.pixel_type = PixelType::SK6812W;
    assert_eq!(
        PixelOutput::new(strips(1), cfg).err(),
        Some(OutputError::UnsupportedType)
    );
    assert_eq!(
        PixelOutput::new(strips(2), config(10, 3)).err(),
        Some(OutputError::TooManyPorts)
    );
}

#[test]
fn test_blackout_writes_black_to_every_strip() {
    let mut output = PixelOutput::new(strips(2), config(3, 2)).unwrap();
    output.write(0, 0, &[255; 9]);
    output.render();
    output.blackout();

    for port in 0..2 {
        let frame = output.driver().writer(port).unwrap().last_frame.clone().unwrap();
        assert_eq!(frame, vec![RGB8::default(); 3]);
    }
}

#[test]
fn test_render_deferred_while_driver_busy() {
    let mut output = PixelOutput::new(MockPixelDriver::new(new_log()), config(3, 1)).unwrap();
    output.write(0, 0, &[1; 9]);

    output.driver_mut().updating = true;
    assert!(!output.render());
    assert_eq!(output.driver().updates, 0);
    assert!(output.is_dirty());

    // Nachgeholt, sobald der Treiber frei ist
    output.driver_mut().updating = false;
    assert!(output.render());
    assert_eq!(output.driver().updates, 1);
    assert!(!output.is_dirty());
}
