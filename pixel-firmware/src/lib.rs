// Library-Root: Board-Support für den ESP32-C6 Pixel-Node
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod board;
pub mod config;
pub mod hal;
pub mod net;
pub mod tasks;

pub use board::{Board, Radio};

/// Legt einen Wert in einer funktionslokalen `StaticCell` ab
///
/// Jede Aufrufstelle darf nur einmal durchlaufen werden.
#[macro_export]
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write($val);
        x
    }};
}
