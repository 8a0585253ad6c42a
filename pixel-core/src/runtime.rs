//! Run-Loop Scheduler
//!
//! Zwei Zustände:
//! - **Starting** (`NodeRuntime::start`): Komponenten in Abhängigkeits-
//!   reihenfolge aufbauen, jeden Namespace laden, Flash-Queue leeren,
//!   alle `start()` aufrufen.
//! - **Running** (`tick`/`run`): feste Reihenfolge pro Durchlauf, kein
//!   Schritt blockiert. Endet nur durch Reset oder Watchdog.
//!
//! Der Runtime besitzt jede Komponente. Im Testmuster-Modus gehört der
//! Pixel-Ausgang exklusiv dem Testmuster-Generator, der Knoten bekommt
//! keinen.

use embedded_storage::nor_flash::NorFlash;

use crate::node::{LightNode, NodeStatus, Protocol};
use crate::output::{OutputDevice, OutputError, PixelOutput};
use crate::params::{
    DisplayParams, NetworkParams, NodeParams, PixelParams, RdmParams, RemoteConfigParams,
};
use crate::pattern::{PixelTestPattern, TestPattern};
use crate::rdm::{Personality, RdmDevice, pixel_description};
use crate::remote::RemoteConfig;
use crate::router::UniverseMap;
use crate::store::ConfigStore;
use crate::traits::{PixelDriver, Platform};
use crate::types::{
    DMX_UNIVERSE_SIZE, DisplaySettings, NetworkConfig, PixelConfiguration, StartupStatus,
};

/// Feste Start-Parameter der Firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeConfig {
    pub protocol: Protocol,
    /// Werks-Label des RDM-Geräts
    pub label: &'static str,
    pub version: &'static str,
}

/// Fehler, die den Übergang nach Running verhindern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    Output(OutputError),
}

impl From<OutputError> for StartError {
    fn from(e: OutputError) -> Self {
        StartError::Output(e)
    }
}

pub struct NodeRuntime<P, D, F>
where
    P: Platform,
    D: PixelDriver,
    F: NorFlash,
{
    platform: P,
    node: LightNode<PixelOutput<D>>,
    pattern: Option<PixelTestPattern<PixelOutput<D>>>,
    rdm: RdmDevice,
    store: ConfigStore<F>,
    remote: RemoteConfig,
    display: DisplaySettings,
    network: NetworkConfig,
}

impl<P, D, F> NodeRuntime<P, D, F>
where
    P: Platform,
    D: PixelDriver,
    F: NorFlash,
{
    /// Starting-Zustand
    pub fn start(
        mut platform: P,
        driver: D,
        flash: F,
        base: u32,
        config: RuntimeConfig,
    ) -> Result<Self, StartError> {
        let mut store = ConfigStore::new(flash, base);

        // ====================================================================
        // network
        // ====================================================================
        platform.text_status(StartupStatus::Network);
        let mut network = NetworkConfig::default();
        if let Some(params) = store.load::<NetworkParams>() {
            params.dump();
            params.set(&mut network);
        }
        platform.init_network(&network);

        // ====================================================================
        // pixel
        // ====================================================================
        platform.text_status(StartupStatus::Pixel);
        let mut pixel = PixelConfiguration::default();
        if let Some(params) = store.load::<PixelParams>() {
            params.dump();
            params.set(&mut pixel);
        }
        let output = match PixelOutput::new(driver, pixel) {
            Ok(output) => output,
            Err(e) => {
                error!("Runtime: output setup failed: {}", e);
                platform.text_status(StartupStatus::Error);
                return Err(e.into());
            }
        };
        output.print();

        // ====================================================================
        // node
        // ====================================================================
        platform.text_status(StartupStatus::Node);
        let mut node = LightNode::new(config.protocol);
        if let Some(params) = store.load::<NodeParams>() {
            params.dump();
            params.set(&mut node);
        }

        let ports = output.output_ports();
        let map = UniverseMap::build(
            &output.config().start_universes[..ports],
            output.universes(),
            node.slot_stride(),
        );
        node.apply_map(&map);

        let footprint = (ports * output.universes() * DMX_UNIVERSE_SIZE) as u16;
        let description = pixel_description(config.protocol.name(), output.config());

        let pattern = match TestPattern::from_id(output.config().test_pattern) {
            Some(TestPattern::None) | None => {
                node.set_output(Some(output));
                None
            }
            Some(pattern) => Some(PixelTestPattern::new(output, pattern)),
        };

        // ====================================================================
        // rdm
        // ====================================================================
        platform.text_status(StartupStatus::Rdm);
        let mut rdm = RdmDevice::new(platform.hardware_id(), config.label);
        rdm.add_personality(Personality::new(footprint, &description));
        let uid = rdm.init();
        node.set_rdm_uid(uid);
        if let Some(params) = store.load::<RdmParams>() {
            params.dump();
            params.set(&mut rdm);
        }

        // ====================================================================
        // display + rconfig
        // ====================================================================
        let mut display = DisplaySettings::default();
        if let Some(params) = store.load::<DisplayParams>() {
            params.dump();
            params.set(&mut display);
        }
        platform.configure_display(&display);

        let mut remote = RemoteConfig::new(
            &network.hostname,
            config.protocol.name(),
            ports,
            config.version,
        );
        if let Some(params) = store.load::<RemoteConfigParams>() {
            params.dump();
            params.set(&mut remote);
        }

        platform.text_status(StartupStatus::Store);
        store.drain();

        node.start(platform.protocol());
        node.print();
        rdm.start();

        platform.init_watchdog();
        platform.text_status(StartupStatus::Started);
        info!("Runtime: started, version {}", config.version);

        Ok(Self {
            platform,
            node,
            pattern,
            rdm,
            store,
            remote,
            display,
            network,
        })
    }

    /// Ein Running-Durchlauf
    pub fn tick(&mut self) {
        // Watchdog immer zuerst
        self.platform.feed_watchdog();
        let now = self.platform.now_ms();

        self.platform.run_network();
        self.node.run(now, self.platform.protocol(), &mut self.store);
        self.rdm.run(self.platform.llrp(), &mut self.store);
        self.store.flash();

        let remote_reboot = self.remote.run(self.platform.remote(), &mut self.store, now);
        let status = self.status();
        self.platform.run_housekeeping(&status);

        if let Some(pattern) = self.pattern.as_mut() {
            pattern.run(now);
        }

        if remote_reboot || self.platform.take_reboot_request() {
            self.reboot();
        }
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    /// Ausgänge dunkel, Flash leeren, dann Reset
    pub fn reboot(&mut self) {
        warn!("Runtime: reboot");
        if let Some(output) = self.node.output_mut() {
            output.blackout();
        }
        if let Some(pattern) = self.pattern.as_mut() {
            pattern.output_mut().blackout();
        }
        self.store.drain();
        self.platform.reset();
    }

    pub fn status(&self) -> NodeStatus {
        let mut status = self.node.status();
        status.test_pattern = self.pattern.is_some();
        status.identify = self.rdm.is_identifying();
        status
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn node(&self) -> &LightNode<PixelOutput<D>> {
        &self.node
    }

    pub fn pattern(&self) -> Option<&PixelTestPattern<PixelOutput<D>>> {
        self.pattern.as_ref()
    }

    pub fn rdm(&self) -> &RdmDevice {
        &self.rdm
    }

    pub fn store(&self) -> &ConfigStore<F> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore<F> {
        &mut self.store
    }

    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }

    pub fn display_settings(&self) -> &DisplaySettings {
        &self.display
    }

    pub fn network_config(&self) -> &NetworkConfig {
        &self.network
    }
}

/// Software-Modell des Hardware-Watchdogs für Host-Umgebungen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftWatchdog {
    deadline_ms: u64,
    last_feed_ms: u64,
}

impl SoftWatchdog {
    pub fn new(deadline_ms: u64, now_ms: u64) -> Self {
        Self {
            deadline_ms,
            last_feed_ms: now_ms,
        }
    }

    pub fn feed(&mut self, now_ms: u64) {
        self.last_feed_ms = now_ms;
    }

    /// `true` sobald seit dem letzten Füttern mehr als die Frist verging
    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_feed_ms) > self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_watchdog_deadline() {
        let mut wdt = SoftWatchdog::new(1_000, 0);
        assert!(!wdt.expired(1_000));
        assert!(wdt.expired(1_001));
        wdt.feed(1_001);
        assert!(!wdt.expired(1_500));
    }
}
