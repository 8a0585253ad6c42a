//! Pixel Core - Platform-agnostic Node Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie enthält Router, Output-Buffer, Protokoll-Knoten, RDM-Identität,
//! Config-Store und den Run-Loop; die Hardware kommt über Traits herein.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// Muss zuerst stehen, damit die Log-Makros in allen Modulen sichtbar sind
#[macro_use]
mod fmt;

pub mod codec;
pub mod node;
pub mod output;
pub mod params;
pub mod pattern;
pub mod rdm;
pub mod remote;
pub mod router;
pub mod runtime;
pub mod status;
pub mod store;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use node::{Failsafe, LightNode, NodeStatus, Protocol};
pub use output::{OutputDevice, OutputError, PixelOutput, StripDriver};
pub use pattern::{PixelTestPattern, TestPattern};
pub use rdm::RdmDevice;
pub use remote::RemoteConfig;
pub use router::{SlotStride, UniverseMap};
pub use runtime::{NodeRuntime, RuntimeConfig, SoftWatchdog, StartError};
pub use status::StatusIndicator;
pub use store::{ConfigStore, Namespace};
pub use traits::{
    LedError, LlrpTransport, NodeStore, PixelDriver, Platform, ProtocolTransport, RdmStore,
    RemoteTransport, SmartLedWriter,
};
pub use types::{PixelConfiguration, PixelMap, PixelType, StartupStatus, Uid};
