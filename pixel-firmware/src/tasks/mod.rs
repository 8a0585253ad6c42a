// Task-Modul: Embassy Tasks neben dem Run-Loop
//
// Der Run-Loop selbst läuft in `main`. Hier nur, was von sich aus
// asynchron ist: WiFi-Verbindung, embassy-net Runner, mDNS Responder.

pub mod mdns;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use mdns::mdns_responder_task;
pub use wifi::{connection_task, net_task};
