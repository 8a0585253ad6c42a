//! RDM Device Identity
//!
//! Modelliert den Node als LLRP-auffindbaren RDM-Endpunkt, unabhängig davon,
//! ob RDM über DMX aktiv ist.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::traits::{LlrpTransport, RdmStore};
use crate::types::{LlrpRequest, PixelConfiguration, Uid, truncated};

/// ESTA Hersteller-ID (Prototyp-Bereich)
pub const MANUFACTURER_ID: u16 = 0x7FF0;

pub const PRODUCT_CATEGORY_FIXTURE: u16 = 0x0100;
pub const PRODUCT_DETAIL_ETHERNET_NODE: u16 = 0x0900;

const MAX_PERSONALITIES: usize = 4;
const MAX_REQUESTS_PER_RUN: usize = 4;

pub type Label = String<32>;

/// Beschreibung "<Protokoll> Pixel <Ports>-<Typ>:<Anzahl>"
pub fn pixel_description(protocol: &str, config: &PixelConfiguration) -> Label {
    let mut description = Label::new();
    let _ = write!(
        description,
        "{} Pixel {}-{}:{}",
        protocol,
        config.active_ports(),
        config.pixel_type.name(),
        config.count
    );
    description
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Personality {
    pub footprint: u16,
    pub description: Label,
}

impl Personality {
    pub fn new(footprint: u16, description: &str) -> Self {
        Self {
            footprint,
            description: truncated(description),
        }
    }
}

/// Werkszustand, festgehalten bei `init()`
#[derive(Debug, Clone, PartialEq, Eq)]
struct FactorySnapshot {
    label: Label,
    personality: usize,
}

pub struct RdmDevice {
    hardware_id: [u8; 6],
    uid: Option<Uid>,
    label: Label,
    personalities: Vec<Personality, MAX_PERSONALITIES>,
    personality: usize,
    category: u16,
    detail: u16,
    identify: bool,
    started: bool,
    factory: Option<FactorySnapshot>,
}

impl RdmDevice {
    pub fn new(hardware_id: [u8; 6], label: &str) -> Self {
        Self {
            hardware_id,
            uid: None,
            label: truncated(label),
            personalities: Vec::new(),
            personality: 0,
            category: PRODUCT_CATEGORY_FIXTURE,
            detail: PRODUCT_DETAIL_ETHERNET_NODE,
            identify: false,
            started: false,
            factory: None,
        }
    }

    pub fn add_personality(&mut self, personality: Personality) -> bool {
        self.personalities.push(personality).is_ok()
    }

    pub fn personalities(&self) -> &[Personality] {
        &self.personalities
    }

    pub fn set_personality(&mut self, index: usize) -> bool {
        if index < self.personalities.len() {
            self.personality = index;
            true
        } else {
            false
        }
    }

    pub fn personality(&self) -> Option<&Personality> {
        self.personalities.get(self.personality)
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = truncated(label);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_product_category(&mut self, category: u16) {
        self.category = category;
    }

    pub fn set_product_detail(&mut self, detail: u16) {
        self.detail = detail;
    }

    pub fn product_category(&self) -> u16 {
        self.category
    }

    pub fn product_detail(&self) -> u16 {
        self.detail
    }

    /// Legt die UID fest und merkt sich den Werkszustand.
    ///
    /// Muss vor `LightNode::set_rdm_uid` laufen.
    pub fn init(&mut self) -> Uid {
        let uid = Uid::from_hardware_id(MANUFACTURER_ID, self.hardware_id);
        self.uid = Some(uid);
        self.factory = Some(FactorySnapshot {
            label: self.label.clone(),
            personality: self.personality,
        });
        info!("RDM: UID {:04x}:{:08x}", uid.manufacturer, uid.device);
        uid
    }

    /// `None` bis `init()` gelaufen ist
    pub fn uid(&self) -> Option<Uid> {
        self.uid
    }

    pub fn start(&mut self) {
        self.started = true;
        info!("RDM: started, label '{}'", self.label.as_str());
    }

    pub fn is_identifying(&self) -> bool {
        self.identify
    }

    pub fn is_factory_default(&self) -> bool {
        self.factory.as_ref().is_some_and(|f| {
            f.label == self.label && f.personality == self.personality
        })
    }

    /// Ein nicht-blockierender LLRP-Durchlauf
    pub fn run<L, S>(&mut self, llrp: &mut L, store: &mut S)
    where
        L: LlrpTransport,
        S: RdmStore,
    {
        if !self.started {
            return;
        }
        let Some(uid) = self.uid else {
            return;
        };

        for _ in 0..MAX_REQUESTS_PER_RUN {
            let Some(request) = llrp.receive() else {
                break;
            };
            match request {
                LlrpRequest::Probe { lower, upper } => {
                    if (lower..=upper).contains(&uid) {
                        llrp.send_probe_reply(uid);
                    }
                }
                LlrpRequest::Identify(on) => {
                    debug!("RDM: identify {}", on);
                    self.identify = on;
                }
                LlrpRequest::SetLabel(label) => {
                    self.label = truncated(label);
                    store.save_label(&self.label);
                }
                LlrpRequest::FactoryDefaults => self.factory_defaults(store),
            }
        }
    }

    fn factory_defaults<S: RdmStore>(&mut self, store: &mut S) {
        info!("RDM: factory defaults");
        if let Some(factory) = self.factory.clone() {
            self.label = factory.label;
            self.personality = factory.personality;
        }
        self.identify = false;
        store.factory_reset();
    }
}
