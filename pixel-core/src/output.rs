//! Output Device
//!
//! Einheitliche Schnittstelle "N Ports mit je S Universen" über dem
//! physischen Pixel-Treiber. Besitzt die Pixel-Frame-Buffer.

use alloc::vec;
use alloc::vec::Vec;
use core::iter;

use heapless::Vec as HVec;
use rgb::RGB8;

use crate::traits::{LedError, PixelDriver, SmartLedWriter};
use crate::types::{MAX_PORTS, MAX_UNIVERSES_PER_PORT, PixelConfiguration, PixelType};

/// Start-Fehler beim Aufbau der Ausgänge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    TooManyPorts,
    UnsupportedType,
    BufferCapacity,
    TooManyUniverses,
}

/// Schnittstelle für Protokoll-Knoten und Testmuster
pub trait OutputDevice {
    fn output_ports(&self) -> usize;

    /// Slots (Universen) pro Port
    fn universes(&self) -> usize;

    /// Kanaldaten eines Universums in den Port-Buffer kopieren
    fn write(&mut self, port: usize, slot: usize, data: &[u8]);

    /// Geänderte Ports an den Treiber übergeben.
    ///
    /// Gibt `false` zurück, wenn der Treiber noch überträgt und der
    /// Frame beim nächsten Aufruf nachgeholt werden muss.
    fn render(&mut self) -> bool;

    fn blackout(&mut self);

    fn set_pixel(&mut self, port: usize, index: usize, colour: RGB8);

    /// Logische Pixel pro Port
    fn pixel_count(&self) -> usize;

    fn print(&self);
}

/// Pixel-Ausgang über einem [`PixelDriver`]
pub struct PixelOutput<D> {
    driver: D,
    config: PixelConfiguration,
    buffers: Vec<u8>,
    port_len: usize,
    universes: usize,
    dirty: u8,
}

impl<D: PixelDriver> PixelOutput<D> {
    /// Prüft die Konfiguration gegen den Treiber und legt die Buffer an
    pub fn new(driver: D, config: PixelConfiguration) -> Result<Self, OutputError> {
        let ports = config.active_ports();
        if usize::from(config.active_ports) > MAX_PORTS || ports > driver.max_ports() {
            return Err(OutputError::TooManyPorts);
        }
        if !driver.supports(config.pixel_type) {
            return Err(OutputError::UnsupportedType);
        }
        if usize::from(config.count) > driver.max_pixels() {
            return Err(OutputError::BufferCapacity);
        }
        let universes = config.universes();
        if universes > MAX_UNIVERSES_PER_PORT {
            return Err(OutputError::TooManyUniverses);
        }

        let port_len = config.grouped_count() * config.channels_per_pixel();
        info!(
            "Output: {} ports, {} pixels, {} universes/port",
            ports,
            config.count,
            universes
        );

        Ok(Self {
            driver,
            buffers: vec![0; port_len * ports],
            config,
            port_len,
            universes,
            dirty: 0,
        })
    }

    pub fn config(&self) -> &PixelConfiguration {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn buffer(&self, port: usize) -> Option<&[u8]> {
        let start = port.checked_mul(self.port_len)?;
        self.buffers.get(start..start + self.port_len)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    fn buffer_mut(&mut self, port: usize) -> Option<&mut [u8]> {
        let start = port.checked_mul(self.port_len)?;
        self.buffers.get_mut(start..start + self.port_len)
    }
}

impl<D: PixelDriver> OutputDevice for PixelOutput<D> {
    fn output_ports(&self) -> usize {
        self.config.active_ports()
    }

    fn universes(&self) -> usize {
        self.universes
    }

    fn write(&mut self, port: usize, slot: usize, data: &[u8]) {
        if slot >= self.universes {
            return;
        }
        let footprint = self.config.universe_footprint();
        let Some(buffer) = self.buffer_mut(port) else {
            return;
        };

        let offset = slot * footprint;
        if offset >= buffer.len() {
            return;
        }
        let len = data.len().min(footprint).min(buffer.len() - offset);
        buffer[offset..offset + len].copy_from_slice(&data[..len]);
        self.dirty |= 1 << port;
    }

    fn render(&mut self) -> bool {
        if self.dirty == 0 {
            return true;
        }
        if self.driver.is_updating() {
            return false;
        }

        for port in 0..self.output_ports() {
            if self.dirty & (1 << port) == 0 {
                continue;
            }
            let start = port * self.port_len;
            let data = &self.buffers[start..start + self.port_len];
            if let Err(e) = self.driver.update(port, data, &self.config) {
                warn!("Output: port {} update failed: {}", port, e);
            }
        }
        self.dirty = 0;
        true
    }

    fn blackout(&mut self) {
        self.buffers.fill(0);
        self.driver.blackout(&self.config);
        self.dirty = 0;
    }

    fn set_pixel(&mut self, port: usize, index: usize, colour: RGB8) {
        let channels = self.config.channels_per_pixel();
        let Some(buffer) = self.buffer_mut(port) else {
            return;
        };
        let Some(pixel) = buffer.get_mut(index * channels..(index + 1) * channels) else {
            return;
        };
        pixel[..3].copy_from_slice(&[colour.r, colour.g, colour.b]);
        self.dirty |= 1 << port;
    }

    fn pixel_count(&self) -> usize {
        self.config.grouped_count()
    }

    fn print(&self) {
        info!(
            "Output: type={} count={} grouping={} ports={}",
            self.config.pixel_type.name(),
            self.config.count,
            self.config.grouping,
            self.output_ports()
        );
    }
}

/// Generischer Pixel-Treiber: ein [`SmartLedWriter`] pro Port
///
/// Übernimmt Farbreihenfolge (Map) und Gruppierung. Nur RGB-Typen.
pub struct StripDriver<W> {
    writers: HVec<W, MAX_PORTS>,
    max_pixels: usize,
}

impl<W: SmartLedWriter> StripDriver<W> {
    pub fn new(writers: impl IntoIterator<Item = W>, max_pixels: usize) -> Self {
        let mut strips = HVec::new();
        for writer in writers {
            if strips.push(writer).is_err() {
                warn!("Output: more than {} writers, ignoring rest", MAX_PORTS);
                break;
            }
        }
        Self {
            writers: strips,
            max_pixels,
        }
    }

    pub fn writer(&self, port: usize) -> Option<&W> {
        self.writers.get(port)
    }

    pub fn writer_mut(&mut self, port: usize) -> Option<&mut W> {
        self.writers.get_mut(port)
    }
}

impl<W: SmartLedWriter> PixelDriver for StripDriver<W> {
    fn max_ports(&self) -> usize {
        self.writers.len()
    }

    fn max_pixels(&self) -> usize {
        self.max_pixels
    }

    fn supports(&self, pixel_type: PixelType) -> bool {
        pixel_type.channels() == 3
    }

    /// Writer schreiben synchron, ein Frame ist nach `update` draußen
    fn is_updating(&self) -> bool {
        false
    }

    fn update(
        &mut self,
        port: usize,
        data: &[u8],
        config: &PixelConfiguration,
    ) -> Result<(), LedError> {
        let writer = self.writers.get_mut(port).ok_or(LedError::WriteFailed)?;
        let map = config.map();
        let grouping = usize::from(config.grouping.max(1));

        let pixels = (0..usize::from(config.count)).map(|i| {
            let offset = (i / grouping) * 3;
            let rgb = match data.get(offset..offset + 3) {
                Some(px) => [px[0], px[1], px[2]],
                None => [0; 3],
            };
            let [w0, w1, w2] = map.wire_order(rgb);
            RGB8 {
                r: w0,
                g: w1,
                b: w2,
            }
        });
        writer.write(pixels)
    }

    fn blackout(&mut self, config: &PixelConfiguration) {
        for writer in self.writers.iter_mut() {
            let black = iter::repeat_n(RGB8::default(), usize::from(config.count));
            if writer.write(black).is_err() {
                error!("Output: blackout write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelMap;
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct RecordingWriter {
        frames: StdVec<StdVec<RGB8>>,
    }

    impl SmartLedWriter for RecordingWriter {
        fn write<I>(&mut self, pixels: I) -> Result<(), LedError>
        where
            I: Iterator<Item = RGB8>,
        {
            self.frames.push(pixels.collect());
            Ok(())
        }
    }

    fn driver(ports: usize) -> StripDriver<RecordingWriter> {
        StripDriver::new((0..ports).map(|_| RecordingWriter::default()), 680)
    }

    fn config(ports: u8, count: u16) -> PixelConfiguration {
        PixelConfiguration {
            active_ports: ports,
            count,
            map: Some(PixelMap::RGB),
            ..Default::default()
        }
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            PixelOutput::new(driver(2), config(3, 170)).err(),
            Some(OutputError::TooManyPorts)
        );
        assert_eq!(
            PixelOutput::new(driver(2), config(1, 681)).err(),
            Some(OutputError::BufferCapacity)
        );
        let rgbw = PixelConfiguration {
            pixel_type: PixelType::SK6812W,
            ..config(1, 170)
        };
        assert_eq!(
            PixelOutput::new(driver(1), rgbw).err(),
            Some(OutputError::UnsupportedType)
        );

        let big = StripDriver::new([RecordingWriter::default()], 2000);
        assert_eq!(
            PixelOutput::new(big, config(1, 1000)).err(),
            Some(OutputError::TooManyUniverses)
        );
    }

    #[test]
    fn test_write_lands_in_slot() {
        let mut output = PixelOutput::new(driver(2), config(2, 340)).unwrap();
        assert_eq!(output.universes(), 2);

        output.write(1, 1, &[7; 512]);
        let buffer = output.buffer(1).unwrap();
        assert_eq!(buffer[509], 0);
        assert_eq!(buffer[510], 7);
        assert_eq!(buffer[1019], 7);
        assert!(output.buffer(0).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_out_of_range_is_ignored() {
        let mut output = PixelOutput::new(driver(1), config(1, 170)).unwrap();
        output.write(1, 0, &[1; 3]);
        output.write(0, 1, &[1; 3]);
        assert!(!output.is_dirty());
    }

    #[test]
    fn test_render_pushes_dirty_ports_only() {
        let mut output = PixelOutput::new(driver(2), config(2, 2)).unwrap();
        output.write(0, 0, &[1, 2, 3, 4, 5, 6]);
        assert!(output.render());

        let first = output.driver().writer(0).unwrap();
        assert_eq!(first.frames.len(), 1);
        assert_eq!(first.frames[0][1], RGB8 { r: 4, g: 5, b: 6 });
        assert!(output.driver().writer(1).unwrap().frames.is_empty());
    }

    #[test]
    fn test_map_and_grouping() {
        let cfg = PixelConfiguration {
            map: Some(PixelMap::GRB),
            grouping: 2,
            ..config(1, 4)
        };
        let mut output = PixelOutput::new(driver(1), cfg).unwrap();
        assert_eq!(output.pixel_count(), 2);

        output.set_pixel(0, 1, RGB8 { r: 10, g: 20, b: 30 });
        output.render();

        let frame = &output.driver().writer(0).unwrap().frames[0];
        assert_eq!(frame.len(), 4);
        assert_eq!(frame[0], RGB8::default());
        assert_eq!(frame[2], RGB8 { r: 20, g: 10, b: 30 });
        assert_eq!(frame[3], RGB8 { r: 20, g: 10, b: 30 });
    }

    #[test]
    fn test_blackout_clears_buffers_and_strips() {
        let mut output = PixelOutput::new(driver(1), config(1, 3)).unwrap();
        output.set_pixel(0, 0, RGB8 { r: 255, g: 255, b: 255 });
        output.blackout();

        assert!(output.buffer(0).unwrap().iter().all(|&b| b == 0));
        assert!(!output.is_dirty());
        let frame = &output.driver().writer(0).unwrap().frames[0];
        assert!(frame.iter().all(|px| *px == RGB8::default()));
    }
}
