//! Remote Config Service
//!
//! UDP-Textprotokoll auf Port 0x2905:
//!
//! | Anfrage                  | Antwort                                  |
//! |--------------------------|------------------------------------------|
//! | `?list#`                 | `<name>,<node>,Pixel,<ports>\n`          |
//! | `?version#`              | `version:<version>\n`                    |
//! | `?uptime#`               | `uptime:<sekunden>\n` (falls freigegeben)|
//! | `?reboot##`              | - (Neustart, falls freigegeben)          |
//! | `?get#<namespace>`       | Datensatz als JSON                       |
//! | `!set#<namespace>#<json>`| - (wird gespeichert)                     |

use core::fmt::Write as _;

use embedded_storage::nor_flash::NorFlash;
use heapless::String;

use crate::params::{
    DisplayParams, NetworkParams, NodeParams, Params, PixelParams, RdmParams, RemoteConfigParams,
};
use crate::store::{ConfigStore, Namespace};
use crate::traits::RemoteTransport;
use crate::types::truncated;

pub const REMOTE_CONFIG_PORT: u16 = 0x2905;

/// Maximale Länge von Anfrage und Antwort
pub const MAX_MESSAGE: usize = 512;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteSettings {
    /// Dienst antwortet auf nichts
    pub disable: bool,
    /// `!set` wird ignoriert
    pub disable_write: bool,
    pub enable_reboot: bool,
    pub enable_uptime: bool,
    /// Ersetzt den Hostnamen in `?list#`
    pub display_name: String<24>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteAction {
    None,
    /// Antwort mit dieser Länge senden
    Reply(usize),
    Reboot,
}

pub struct RemoteConfig {
    settings: RemoteSettings,
    host: String<32>,
    node_type: &'static str,
    active_ports: usize,
    version: &'static str,
}

impl RemoteConfig {
    pub fn new(
        host: &str,
        node_type: &'static str,
        active_ports: usize,
        version: &'static str,
    ) -> Self {
        Self {
            settings: RemoteSettings::default(),
            host: truncated(host),
            node_type,
            active_ports,
            version,
        }
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RemoteSettings {
        &mut self.settings
    }

    /// Bearbeitet höchstens eine Anfrage; `true` = Neustart angefordert
    pub fn run<T, F>(&self, transport: &mut T, store: &mut ConfigStore<F>, now_ms: u64) -> bool
    where
        T: RemoteTransport,
        F: NorFlash,
    {
        let mut request = [0u8; MAX_MESSAGE];
        let Some(len) = transport.receive(&mut request) else {
            return false;
        };
        let mut response = [0u8; MAX_MESSAGE];
        match self.handle(&request[..len.min(MAX_MESSAGE)], store, now_ms, &mut response) {
            RemoteAction::None => false,
            RemoteAction::Reply(len) => {
                transport.reply(&response[..len]);
                false
            }
            RemoteAction::Reboot => true,
        }
    }

    pub fn handle<F: NorFlash>(
        &self,
        request: &[u8],
        store: &mut ConfigStore<F>,
        now_ms: u64,
        response: &mut [u8],
    ) -> RemoteAction {
        if self.settings.disable {
            return RemoteAction::None;
        }
        let request = request.trim_ascii_end();

        if let Some(query) = request.strip_prefix(b"?") {
            self.query(query, store, now_ms, response)
        } else if let Some(body) = request.strip_prefix(b"!set#") {
            self.set(body, store);
            RemoteAction::None
        } else {
            debug!("Remote: unknown request");
            RemoteAction::None
        }
    }

    fn query<F: NorFlash>(
        &self,
        query: &[u8],
        store: &ConfigStore<F>,
        now_ms: u64,
        response: &mut [u8],
    ) -> RemoteAction {
        let mut text: String<MAX_MESSAGE> = String::new();
        match query {
            b"list#" => {
                let name = if self.settings.display_name.is_empty() {
                    self.host.as_str()
                } else {
                    self.settings.display_name.as_str()
                };
                let _ = writeln!(
                    text,
                    "{},{},Pixel,{}",
                    name, self.node_type, self.active_ports
                );
            }
            b"version#" => {
                let _ = writeln!(text, "version:{}", self.version);
            }
            b"uptime#" if self.settings.enable_uptime => {
                let _ = writeln!(text, "uptime:{}", now_ms / 1000);
            }
            b"reboot##" if self.settings.enable_reboot => {
                info!("Remote: reboot requested");
                return RemoteAction::Reboot;
            }
            _ => {
                let Some(name) = query.strip_prefix(b"get#") else {
                    return RemoteAction::None;
                };
                let Some(ns) = core::str::from_utf8(name).ok().and_then(Namespace::from_name)
                else {
                    return RemoteAction::None;
                };
                return match get(ns, store, response) {
                    Some(len) => RemoteAction::Reply(len),
                    None => RemoteAction::None,
                };
            }
        }

        let bytes = text.as_bytes();
        match response.get_mut(..bytes.len()) {
            Some(out) => {
                out.copy_from_slice(bytes);
                RemoteAction::Reply(bytes.len())
            }
            None => RemoteAction::None,
        }
    }

    fn set<F: NorFlash>(&self, body: &[u8], store: &mut ConfigStore<F>) {
        if self.settings.disable_write {
            warn!("Remote: write disabled");
            return;
        }
        let Some(split) = body.iter().position(|&b| b == b'#') else {
            return;
        };
        let (name, json) = (&body[..split], &body[split + 1..]);
        let Some(ns) = core::str::from_utf8(name).ok().and_then(Namespace::from_name) else {
            return;
        };
        if set(ns, store, json) {
            info!("Remote: {} updated", ns.name());
        } else {
            warn!("Remote: {} rejected", ns.name());
        }
    }
}

fn get<F: NorFlash>(ns: Namespace, store: &ConfigStore<F>, out: &mut [u8]) -> Option<usize> {
    match ns {
        Namespace::Network => encode::<NetworkParams, F>(store, out),
        Namespace::Pixel => encode::<PixelParams, F>(store, out),
        Namespace::Node => encode::<NodeParams, F>(store, out),
        Namespace::Rdm => encode::<RdmParams, F>(store, out),
        Namespace::Display => encode::<DisplayParams, F>(store, out),
        Namespace::RemoteConfig => encode::<RemoteConfigParams, F>(store, out),
    }
}

fn set<F: NorFlash>(ns: Namespace, store: &mut ConfigStore<F>, json: &[u8]) -> bool {
    match ns {
        Namespace::Network => merge::<NetworkParams, F>(store, json),
        Namespace::Pixel => merge::<PixelParams, F>(store, json),
        Namespace::Node => merge::<NodeParams, F>(store, json),
        Namespace::Rdm => merge::<RdmParams, F>(store, json),
        Namespace::Display => merge::<DisplayParams, F>(store, json),
        Namespace::RemoteConfig => merge::<RemoteConfigParams, F>(store, json),
    }
}

fn encode<T: Params, F: NorFlash>(store: &ConfigStore<F>, out: &mut [u8]) -> Option<usize> {
    let record = store.load::<T>().unwrap_or_default();
    serde_json_core::to_slice(&record, out).ok()
}

fn merge<T: Params, F: NorFlash>(store: &mut ConfigStore<F>, json: &[u8]) -> bool {
    let Ok((newer, _)) = serde_json_core::from_slice::<T>(json) else {
        return false;
    };
    let mut record = store.load::<T>().unwrap_or_default();
    record.merge(newer);
    store.save(&record).is_ok()
}
