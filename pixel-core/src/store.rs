//! Configuration Store
//!
//! Nicht-blockierende Persistenz über einem NOR-Flash Sektor (4 KiB).
//! Jeder Namespace hat einen festen Slot; Änderungen werden im RAM-Abbild
//! gesammelt und von [`ConfigStore::flash`] schrittweise geschrieben:
//! ein Erase oder ein 256-Byte Program pro Aufruf.
//!
//! Slot-Layout:
//! ```text
//! 0..2  magic   (u16 LE)
//! 2..4  length  (u16 LE)
//! 4..8  crc32   (u32 LE, über die Nutzdaten)
//! 8..   postcard Nutzdaten
//! ```

use alloc::vec;
use alloc::vec::Vec;

use embedded_storage::nor_flash::NorFlash;

use crate::params::{NodeParams, Params, RdmParams};
use crate::traits::{NodeStore, RdmStore};
use crate::types::truncated;

pub const SECTOR_SIZE: usize = 4096;
pub const SLOT_SIZE: usize = 512;
pub const PROGRAM_CHUNK: usize = 256;

const HEADER_LEN: usize = 8;
const SLOT_MAGIC: u16 = 0x5A4E;
const ERASED: u8 = 0xFF;

/// Erase + Program-Schritte eines vollständigen Zyklus
const CYCLE_STEPS: usize = 1 + SECTOR_SIZE / PROGRAM_CHUNK;
pub const DRAIN_CYCLES: usize = 3;

/// Namespaces in Lade-Reihenfolge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Namespace {
    Network,
    Pixel,
    Node,
    Rdm,
    Display,
    RemoteConfig,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Network,
        Namespace::Pixel,
        Namespace::Node,
        Namespace::Rdm,
        Namespace::Display,
        Namespace::RemoteConfig,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Namespace::Network => "network",
            Namespace::Pixel => "pixel",
            Namespace::Node => "node",
            Namespace::Rdm => "rdm",
            Namespace::Display => "display",
            Namespace::RemoteConfig => "rconfig",
        }
    }

    /// Akzeptiert auch die Dateinamen-Form "pixel.txt"
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix(".txt").unwrap_or(name);
        Self::ALL.into_iter().find(|ns| ns.name() == name)
    }

    const fn offset(self) -> usize {
        self as usize * SLOT_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Datensatz passt nicht in einen Slot
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum FlashState {
    Idle,
    Program(usize),
}

pub struct ConfigStore<F> {
    flash: F,
    base: u32,
    image: Vec<u8>,
    dirty: bool,
    state: FlashState,
}

impl<F: NorFlash> ConfigStore<F> {
    /// Liest den Sektor ab `base` ins RAM-Abbild.
    ///
    /// Ein Lesefehler ergibt ein leeres Abbild: alle Namespaces fehlen,
    /// die Defaults gelten.
    pub fn new(mut flash: F, base: u32) -> Self {
        let mut image = vec![ERASED; SECTOR_SIZE];
        if flash.read(base, &mut image).is_err() {
            error!("Store: read failed, using defaults");
            image.fill(ERASED);
        }
        Self {
            flash,
            base,
            image,
            dirty: false,
            state: FlashState::Idle,
        }
    }

    fn slot(&self, ns: Namespace) -> &[u8] {
        &self.image[ns.offset()..ns.offset() + SLOT_SIZE]
    }

    /// `None` = kein gültiger Datensatz, Defaults behalten
    pub fn load<T: Params>(&self) -> Option<T> {
        let slot = self.slot(T::NAMESPACE);
        if u16::from_le_bytes([slot[0], slot[1]]) != SLOT_MAGIC {
            return None;
        }
        let len = usize::from(u16::from_le_bytes([slot[2], slot[3]]));
        let crc = u32::from_le_bytes([slot[4], slot[5], slot[6], slot[7]]);
        let payload = slot.get(HEADER_LEN..HEADER_LEN + len)?;
        if crc32fast::hash(payload) != crc {
            warn!("Store: {} checksum mismatch", T::NAMESPACE.name());
            return None;
        }
        match postcard::from_bytes(payload) {
            Ok(record) => Some(record),
            Err(_) => {
                warn!("Store: {} decode failed", T::NAMESPACE.name());
                None
            }
        }
    }

    /// Schreibt den Datensatz ins Abbild; unveränderte Daten lösen kein Flush aus
    pub fn save<T: Params>(&mut self, record: &T) -> Result<(), StoreError> {
        let mut slot = [ERASED; SLOT_SIZE];
        let len = postcard::to_slice(record, &mut slot[HEADER_LEN..])
            .map_err(|_| StoreError::TooLarge)?
            .len();
        let crc = crc32fast::hash(&slot[HEADER_LEN..HEADER_LEN + len]);
        slot[0..2].copy_from_slice(&SLOT_MAGIC.to_le_bytes());
        slot[2..4].copy_from_slice(&(len as u16).to_le_bytes());
        slot[4..8].copy_from_slice(&crc.to_le_bytes());
        slot[HEADER_LEN + len..].fill(ERASED);

        self.replace_slot(T::NAMESPACE, &slot);
        Ok(())
    }

    /// Entfernt einen Namespace (zurück auf Defaults)
    pub fn erase(&mut self, ns: Namespace) {
        self.replace_slot(ns, &[ERASED; SLOT_SIZE]);
    }

    fn replace_slot(&mut self, ns: Namespace, slot: &[u8; SLOT_SIZE]) {
        let range = ns.offset()..ns.offset() + SLOT_SIZE;
        if self.image[range.clone()] == slot[..] {
            return;
        }
        self.image[range].copy_from_slice(slot);
        self.dirty = true;
        debug!("Store: {} changed", ns.name());
    }

    pub fn factory_reset(&mut self) {
        for ns in Namespace::ALL {
            self.erase(ns);
        }
    }

    /// Ein Schritt der Flush-Zustandsmaschine.
    ///
    /// Gibt `true` zurück, solange noch Arbeit ansteht. Ohne ausstehende
    /// Änderungen wird das Flash nicht angefasst.
    pub fn flash(&mut self) -> bool {
        match self.state {
            FlashState::Idle if !self.dirty => return false,
            // Neuer Zyklus, auch wenn ein Save einen laufenden Zyklus überholt hat
            FlashState::Idle | FlashState::Program(_) if self.dirty => self.erase_sector(),
            FlashState::Program(offset) => self.program(offset),
            FlashState::Idle => {}
        }
        self.is_busy()
    }

    fn erase_sector(&mut self) {
        self.dirty = false;
        let end = self.base + SECTOR_SIZE as u32;
        match self.flash.erase(self.base, end) {
            Ok(()) => self.state = FlashState::Program(0),
            Err(_) => {
                error!("Store: erase failed, retrying");
                self.restart();
            }
        }
    }

    fn program(&mut self, offset: usize) {
        let chunk = &self.image[offset..offset + PROGRAM_CHUNK];
        if self.flash.write(self.base + offset as u32, chunk).is_err() {
            error!("Store: write failed at {}, retrying", offset);
            self.restart();
            return;
        }
        let next = offset + PROGRAM_CHUNK;
        self.state = if next >= SECTOR_SIZE {
            info!("Store: sector written");
            FlashState::Idle
        } else {
            FlashState::Program(next)
        };
    }

    /// Sektor ist halb geschrieben oder gelöscht: ganzen Zyklus neu starten
    fn restart(&mut self) {
        self.dirty = true;
        self.state = FlashState::Idle;
    }

    /// Synchrones Leeren der Queue (nur beim Start und vor Reboot).
    ///
    /// Begrenzt auf [`DRAIN_CYCLES`] volle Zyklen, ein defekter Flash
    /// blockiert den Start nicht.
    pub fn drain(&mut self) {
        for _ in 0..DRAIN_CYCLES * CYCLE_STEPS {
            if !self.flash() {
                return;
            }
        }
        error!("Store: flash still busy, giving up");
    }

    pub fn is_busy(&self) -> bool {
        self.dirty || self.state != FlashState::Idle
    }

    pub fn storage(&self) -> &F {
        &self.flash
    }

    pub fn storage_mut(&mut self) -> &mut F {
        &mut self.flash
    }
}

impl<F: NorFlash> NodeStore for ConfigStore<F> {
    fn save_short_name(&mut self, name: &str) {
        let mut params = self.load::<NodeParams>().unwrap_or_default();
        params.short_name = Some(truncated(name));
        if self.save(&params).is_err() {
            warn!("Store: node record too large");
        }
    }

    fn save_long_name(&mut self, name: &str) {
        let mut params = self.load::<NodeParams>().unwrap_or_default();
        params.long_name = Some(truncated(name));
        if self.save(&params).is_err() {
            warn!("Store: node record too large");
        }
    }
}

impl<F: NorFlash> RdmStore for ConfigStore<F> {
    fn save_label(&mut self, label: &str) {
        let mut params = self.load::<RdmParams>().unwrap_or_default();
        params.label = Some(truncated(label));
        if self.save(&params).is_err() {
            warn!("Store: rdm record too large");
        }
    }

    fn factory_reset(&mut self) {
        ConfigStore::factory_reset(self);
    }
}
