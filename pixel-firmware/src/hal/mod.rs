// Hardware Abstraction Layer (HAL) Module
//
// Board-Peripherie hinter kleinen Wrappern: RMT-Pixelstränge,
// Status-LED und Konsolen-Display.

pub mod display;
pub mod led_writer;
pub mod status_led;

pub use display::ConsoleDisplay;
pub use led_writer::RmtLedWriter;
pub use status_led::StatusLed;
