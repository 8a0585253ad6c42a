//! Parameter-Datensätze der Namespaces
//!
//! Jedes Feld ist optional: `None` heißt "nicht konfiguriert, Default
//! behalten". Datensätze werden mit postcard im Flash und mit
//! serde-json-core im Remote-Config-Dienst kodiert.

use heapless::String;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::node::{Failsafe, LightNode, LongName, ShortName};
use crate::output::OutputDevice;
use crate::rdm::{Label, RdmDevice};
use crate::remote::RemoteConfig;
use crate::router::SlotStride;
use crate::store::Namespace;
use crate::types::{
    DisplaySettings, MAX_PORTS, NetworkConfig, PixelConfiguration, PixelMap, PixelType,
};

/// Ein persistierbarer Namespace-Datensatz
pub trait Params: Serialize + DeserializeOwned + Default {
    const NAMESPACE: Namespace;

    /// Übernimmt alle gesetzten Felder von `newer`
    fn merge(&mut self, newer: Self);
}

fn take<T>(field: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *field = newer;
    }
}

// ============================================================================
// network
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    pub use_dhcp: Option<bool>,
    pub ip: Option<[u8; 4]>,
    pub netmask: Option<[u8; 4]>,
    pub gateway: Option<[u8; 4]>,
    pub hostname: Option<String<32>>,
}

impl Params for NetworkParams {
    const NAMESPACE: Namespace = Namespace::Network;

    fn merge(&mut self, newer: Self) {
        take(&mut self.use_dhcp, newer.use_dhcp);
        take(&mut self.ip, newer.ip);
        take(&mut self.netmask, newer.netmask);
        take(&mut self.gateway, newer.gateway);
        take(&mut self.hostname, newer.hostname);
    }
}

impl NetworkParams {
    pub fn set(&self, config: &mut NetworkConfig) {
        if let Some(use_dhcp) = self.use_dhcp {
            config.use_dhcp = use_dhcp;
        }
        if let Some(ip) = self.ip {
            config.ip = ip;
        }
        if let Some(netmask) = self.netmask {
            config.netmask = netmask;
        }
        if let Some(gateway) = self.gateway {
            config.gateway = gateway;
        }
        if let Some(hostname) = &self.hostname {
            config.hostname = hostname.clone();
        }
    }

    pub fn dump(&self) {
        info!("Store: network dhcp={} ip={}", self.use_dhcp, self.ip);
    }
}

// ============================================================================
// pixel
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelParams {
    pub pixel_type: Option<PixelType>,
    pub count: Option<u16>,
    pub map: Option<PixelMap>,
    pub grouping: Option<u16>,
    pub active_ports: Option<u8>,
    pub test_pattern: Option<u8>,
    /// Ersetzt die gesamte Default-Tabelle; `None`-Einträge deaktivieren Ports
    pub start_universes: Option<[Option<u16>; MAX_PORTS]>,
}

impl Params for PixelParams {
    const NAMESPACE: Namespace = Namespace::Pixel;

    fn merge(&mut self, newer: Self) {
        take(&mut self.pixel_type, newer.pixel_type);
        take(&mut self.count, newer.count);
        take(&mut self.map, newer.map);
        take(&mut self.grouping, newer.grouping);
        take(&mut self.active_ports, newer.active_ports);
        take(&mut self.test_pattern, newer.test_pattern);
        take(&mut self.start_universes, newer.start_universes);
    }
}

impl PixelParams {
    pub fn set(&self, config: &mut PixelConfiguration) {
        if let Some(pixel_type) = self.pixel_type {
            config.pixel_type = pixel_type;
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if self.map.is_some() {
            config.map = self.map;
        }
        if let Some(grouping) = self.grouping {
            config.grouping = grouping.max(1);
        }
        if let Some(active_ports) = self.active_ports {
            config.active_ports = active_ports;
        }
        if let Some(test_pattern) = self.test_pattern {
            config.test_pattern = test_pattern;
        }
        if let Some(start_universes) = self.start_universes {
            config.start_universes = start_universes;
        }
    }

    pub fn dump(&self) {
        info!(
            "Store: pixel type={} count={} ports={} pattern={}",
            self.pixel_type,
            self.count,
            self.active_ports,
            self.test_pattern
        );
    }
}

// ============================================================================
// node
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeParams {
    pub short_name: Option<ShortName>,
    pub long_name: Option<LongName>,
    pub failsafe: Option<Failsafe>,
    pub slot_stride: Option<SlotStride>,
}

impl Params for NodeParams {
    const NAMESPACE: Namespace = Namespace::Node;

    fn merge(&mut self, newer: Self) {
        take(&mut self.short_name, newer.short_name);
        take(&mut self.long_name, newer.long_name);
        take(&mut self.failsafe, newer.failsafe);
        take(&mut self.slot_stride, newer.slot_stride);
    }
}

impl NodeParams {
    pub fn set<O: OutputDevice>(&self, node: &mut LightNode<O>) {
        if let Some(name) = &self.short_name {
            node.set_short_name(name);
        }
        if let Some(name) = &self.long_name {
            node.set_long_name(name);
        }
        if let Some(failsafe) = self.failsafe {
            node.set_failsafe(failsafe);
        }
        if let Some(stride) = self.slot_stride {
            node.set_slot_stride(stride);
        }
    }

    pub fn dump(&self) {
        info!(
            "Store: node short={} failsafe={}",
            self.short_name.as_ref().map(|s| s.as_str()),
            self.failsafe
        );
    }
}

// ============================================================================
// rdm
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdmParams {
    pub label: Option<Label>,
    pub personality: Option<u8>,
}

impl Params for RdmParams {
    const NAMESPACE: Namespace = Namespace::Rdm;

    fn merge(&mut self, newer: Self) {
        take(&mut self.label, newer.label);
        take(&mut self.personality, newer.personality);
    }
}

impl RdmParams {
    pub fn set(&self, device: &mut RdmDevice) {
        if let Some(label) = &self.label {
            device.set_label(label);
        }
        if let Some(personality) = self.personality {
            device.set_personality(usize::from(personality));
        }
    }

    pub fn dump(&self) {
        info!("Store: rdm label={}", self.label.as_ref().map(|s| s.as_str()));
    }
}

// ============================================================================
// display
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParams {
    pub enabled: Option<bool>,
    pub sleep_timeout_min: Option<u8>,
    pub flip: Option<bool>,
}

impl Params for DisplayParams {
    const NAMESPACE: Namespace = Namespace::Display;

    fn merge(&mut self, newer: Self) {
        take(&mut self.enabled, newer.enabled);
        take(&mut self.sleep_timeout_min, newer.sleep_timeout_min);
        take(&mut self.flip, newer.flip);
    }
}

impl DisplayParams {
    pub fn set(&self, settings: &mut DisplaySettings) {
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        if let Some(timeout) = self.sleep_timeout_min {
            settings.sleep_timeout_min = timeout;
        }
        if let Some(flip) = self.flip {
            settings.flip = flip;
        }
    }

    pub fn dump(&self) {
        info!("Store: display enabled={}", self.enabled);
    }
}

// ============================================================================
// rconfig
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfigParams {
    pub disable: Option<bool>,
    pub disable_write: Option<bool>,
    pub enable_reboot: Option<bool>,
    pub enable_uptime: Option<bool>,
    pub display_name: Option<String<24>>,
}

impl Params for RemoteConfigParams {
    const NAMESPACE: Namespace = Namespace::RemoteConfig;

    fn merge(&mut self, newer: Self) {
        take(&mut self.disable, newer.disable);
        take(&mut self.disable_write, newer.disable_write);
        take(&mut self.enable_reboot, newer.enable_reboot);
        take(&mut self.enable_uptime, newer.enable_uptime);
        take(&mut self.display_name, newer.display_name);
    }
}

impl RemoteConfigParams {
    pub fn set(&self, remote: &mut RemoteConfig) {
        let settings = remote.settings_mut();
        if let Some(disable) = self.disable {
            settings.disable = disable;
        }
        if let Some(disable_write) = self.disable_write {
            settings.disable_write = disable_write;
        }
        if let Some(enable_reboot) = self.enable_reboot {
            settings.enable_reboot = enable_reboot;
        }
        if let Some(enable_uptime) = self.enable_uptime {
            settings.enable_uptime = enable_uptime;
        }
        if let Some(name) = &self.display_name {
            settings.display_name = name.clone();
        }
    }

    pub fn dump(&self) {
        info!(
            "Store: rconfig disable={} write={}",
            self.disable,
            self.disable_write
        );
    }
}
