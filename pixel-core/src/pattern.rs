//! Pixel Test-Pattern Generator
//!
//! Besitzt das Output Device exklusiv, solange ein Testmuster aktiv ist.
//! Jeder Aufruf von [`PixelTestPattern::run`] ist nicht-blockierend und
//! rückt das Muster höchstens um einen Schritt vor.

use rgb::RGB8;

use crate::output::OutputDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestPattern {
    None = 0,
    RainbowCycle = 1,
    TheaterChase = 2,
    ColourWipe = 3,
    Scanner = 4,
    Fade = 5,
}

impl TestPattern {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(TestPattern::None),
            1 => Some(TestPattern::RainbowCycle),
            2 => Some(TestPattern::TheaterChase),
            3 => Some(TestPattern::ColourWipe),
            4 => Some(TestPattern::Scanner),
            5 => Some(TestPattern::Fade),
            _ => None,
        }
    }

    /// Schrittweite in Millisekunden
    pub const fn interval_ms(self) -> u64 {
        match self {
            TestPattern::None => 0,
            TestPattern::RainbowCycle => 20,
            TestPattern::TheaterChase => 50,
            TestPattern::ColourWipe => 20,
            TestPattern::Scanner => 30,
            TestPattern::Fade => 10,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TestPattern::None => "None",
            TestPattern::RainbowCycle => "Rainbow cycle",
            TestPattern::TheaterChase => "Theater chase",
            TestPattern::ColourWipe => "Colour wipe",
            TestPattern::Scanner => "Scanner",
            TestPattern::Fade => "Fade",
        }
    }
}

/// Farbrad 0..=255 → R → G → B → R
pub fn wheel(position: u8) -> RGB8 {
    let position = 255 - position;
    match position {
        0..=84 => RGB8 {
            r: 255 - position * 3,
            g: 0,
            b: position * 3,
        },
        85..=169 => {
            let p = position - 85;
            RGB8 {
                r: 0,
                g: p * 3,
                b: 255 - p * 3,
            }
        }
        _ => {
            let p = position - 170;
            RGB8 {
                r: p * 3,
                g: 255 - p * 3,
                b: 0,
            }
        }
    }
}

pub struct PixelTestPattern<O> {
    output: O,
    pattern: TestPattern,
    step: u32,
    last_ms: Option<u64>,
}

impl<O: OutputDevice> PixelTestPattern<O> {
    pub fn new(output: O, pattern: TestPattern) -> Self {
        info!("Pattern: {}", pattern.name());
        Self {
            output,
            pattern,
            step: 0,
            last_ms: None,
        }
    }

    pub fn pattern(&self) -> TestPattern {
        self.pattern
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    /// Ein Schritt pro Intervall, dazwischen No-Op
    pub fn run(&mut self, now_ms: u64) {
        if self.pattern == TestPattern::None {
            return;
        }
        if let Some(last) = self.last_ms {
            if now_ms.saturating_sub(last) < self.pattern.interval_ms() {
                return;
            }
        }
        self.last_ms = Some(now_ms);

        self.draw();
        self.output.render();
        self.step = self.step.wrapping_add(1);
    }

    fn draw(&mut self) {
        let count = self.output.pixel_count();
        if count == 0 {
            return;
        }
        let step = self.step as usize;

        for port in 0..self.output.output_ports() {
            match self.pattern {
                TestPattern::None => {}
                TestPattern::RainbowCycle => {
                    for i in 0..count {
                        let position = (i * 256 / count + step) & 0xFF;
                        self.output.set_pixel(port, i, wheel(position as u8));
                    }
                }
                TestPattern::TheaterChase => {
                    let colour = wheel((step & 0xFF) as u8);
                    for i in 0..count {
                        let lit = (i + step) % 3 == 0;
                        let colour = if lit { colour } else { RGB8::default() };
                        self.output.set_pixel(port, i, colour);
                    }
                }
                TestPattern::ColourWipe => {
                    let colour = match (step / count) % 3 {
                        0 => RGB8 { r: 255, g: 0, b: 0 },
                        1 => RGB8 { r: 0, g: 255, b: 0 },
                        _ => RGB8 { r: 0, g: 0, b: 255 },
                    };
                    self.output.set_pixel(port, step % count, colour);
                }
                TestPattern::Scanner => {
                    let period = (2 * count).saturating_sub(2).max(1);
                    let mut position = step % period;
                    if position >= count {
                        position = period - position;
                    }
                    for i in 0..count {
                        let colour = if i == position {
                            RGB8 { r: 255, g: 0, b: 0 }
                        } else {
                            RGB8::default()
                        };
                        self.output.set_pixel(port, i, colour);
                    }
                }
                TestPattern::Fade => {
                    let phase = step % 512;
                    let level = (if phase < 256 { phase } else { 511 - phase }) as u8;
                    for i in 0..count {
                        self.output.set_pixel(
                            port,
                            i,
                            RGB8 {
                                r: level,
                                g: level,
                                b: level,
                            },
                        );
                    }
                }
            }
        }
    }
}
