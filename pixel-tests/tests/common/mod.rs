//! Mocks für die Integration Tests
//!
//! Alle Mocks protokollieren in ein gemeinsames Log, damit Tests die
//! Reihenfolge von Schritten (Watchdog, Blackout, Reset) prüfen können.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use pixel_core::codec::PollReplyPage;
use pixel_core::store::{ConfigStore, SECTOR_SIZE};
use pixel_core::types::{
    DisplaySettings, LlrpRequest, NetworkConfig, ProtocolEvent, StartupStatus,
};
use pixel_core::{
    LedError, LlrpTransport, NodeStatus, PixelConfiguration, PixelDriver, PixelType, Platform,
    ProtocolTransport, RemoteTransport, SmartLedWriter, SoftWatchdog, Uid,
};
use rgb::RGB8;

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn position(log: &Log, entry: &str) -> Option<usize> {
    log.borrow().iter().position(|e| e == entry)
}

// ============================================================================
// Mock LED Writer
// ============================================================================

#[derive(Default)]
pub struct MockLedWriter {
    pub last_frame: Option<Vec<RGB8>>,
    pub write_count: usize,
    pub fail_next_write: bool,
}

impl MockLedWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SmartLedWriter for MockLedWriter {
    fn write<I>(&mut self, pixels: I) -> Result<(), LedError>
    where
        I: Iterator<Item = RGB8>,
    {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }

        self.last_frame = Some(pixels.collect());
        self.write_count += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Pixel Driver
// ============================================================================

pub struct MockPixelDriver {
    pub log: Log,
    pub ports: usize,
    pub max_pixels: usize,
    pub updating: bool,
    pub frames: Vec<Option<Vec<u8>>>,
    pub updates: usize,
    pub blackouts: usize,
}

impl MockPixelDriver {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            ports: 8,
            max_pixels: 680,
            updating: false,
            frames: vec![None; 8],
            updates: 0,
            blackouts: 0,
        }
    }
}

impl PixelDriver for MockPixelDriver {
    fn max_ports(&self) -> usize {
        self.ports
    }

    fn max_pixels(&self) -> usize {
        self.max_pixels
    }

    fn supports(&self, pixel_type: PixelType) -> bool {
        pixel_type != PixelType::P9813
    }

    fn is_updating(&self) -> bool {
        self.updating
    }

    fn update(
        &mut self,
        port: usize,
        data: &[u8],
        _config: &PixelConfiguration,
    ) -> Result<(), LedError> {
        self.updates += 1;
        self.frames[port] = Some(data.to_vec());
        self.log.borrow_mut().push(format!("update:{port}"));
        Ok(())
    }

    fn blackout(&mut self, _config: &PixelConfiguration) {
        self.blackouts += 1;
        for frame in self.frames.iter_mut().flatten() {
            frame.fill(0);
        }
        self.log.borrow_mut().push("blackout".into());
    }
}

// ============================================================================
// Memory Flash
// ============================================================================

#[derive(Clone)]
pub struct MemoryFlash {
    pub data: Vec<u8>,
    pub reads: usize,
    pub erases: usize,
    pub writes: usize,
}

impl MemoryFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; SECTOR_SIZE],
            reads: 0,
            erases: 0,
            writes: 0,
        }
    }

    /// Flash mit bereits gespeicherten Datensätzen
    pub fn with(setup: impl FnOnce(&mut ConfigStore<MemoryFlash>)) -> Self {
        let mut store = ConfigStore::new(Self::new(), 0);
        setup(&mut store);
        store.drain();
        let mut flash = store.storage().clone();
        flash.reads = 0;
        flash.erases = 0;
        flash.writes = 0;
        flash
    }

    pub fn accesses(&self) -> usize {
        self.reads + self.erases + self.writes
    }
}

impl ErrorType for MemoryFlash {
    type Error = Infallible;
}

impl ReadNorFlash for MemoryFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Infallible> {
        self.reads += 1;
        let offset = offset as usize;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemoryFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Infallible> {
        self.erases += 1;
        self.data[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Infallible> {
        self.writes += 1;
        let offset = offset as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Flash mit einstellbaren Ausfällen für Erase und Write
#[derive(Debug)]
pub struct FlashFault;

impl NorFlashError for FlashFault {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

pub struct FaultyFlash {
    pub inner: MemoryFlash,
    pub fail_erases: usize,
    pub fail_writes: usize,
}

impl FaultyFlash {
    pub fn new(inner: MemoryFlash) -> Self {
        Self {
            inner,
            fail_erases: 0,
            fail_writes: 0,
        }
    }
}

impl ErrorType for FaultyFlash {
    type Error = FlashFault;
}

impl ReadNorFlash for FaultyFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), FlashFault> {
        let Ok(()) = self.inner.read(offset, bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl NorFlash for FaultyFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), FlashFault> {
        if self.fail_erases > 0 {
            self.fail_erases -= 1;
            return Err(FlashFault);
        }
        let Ok(()) = self.inner.erase(from, to);
        Ok(())
    }

    /// Ein fehlschlagender Write hinterlässt einen halb geschriebenen Chunk
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), FlashFault> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            let half = &bytes[..bytes.len() / 2];
            let Ok(()) = self.inner.write(offset, half);
            return Err(FlashFault);
        }
        let Ok(()) = self.inner.write(offset, bytes);
        Ok(())
    }
}

// ============================================================================
// Mock Transports
// ============================================================================

pub enum Packet {
    Dmx(u16, Vec<u8>),
    Sync,
    Poll,
    Address(Option<String>, Option<String>),
}

#[derive(Default)]
pub struct MockTransport {
    pub queue: VecDeque<Packet>,
    current: Option<Packet>,
    pub poll_replies: Vec<u8>,
    pub joined: Vec<u16>,
}

impl ProtocolTransport for MockTransport {
    fn receive(&mut self) -> Option<ProtocolEvent<'_>> {
        self.current = self.queue.pop_front();
        Some(match self.current.as_ref()? {
            Packet::Dmx(universe, data) => ProtocolEvent::Dmx {
                universe: *universe,
                data,
            },
            Packet::Sync => ProtocolEvent::Sync,
            Packet::Poll => ProtocolEvent::Poll,
            Packet::Address(short, long) => ProtocolEvent::Address {
                short_name: short.as_deref(),
                long_name: long.as_deref(),
            },
        })
    }

    fn send_poll_reply(&mut self, page: &PollReplyPage<'_>) {
        self.poll_replies.push(page.bind_index);
    }

    fn join(&mut self, universe: u16) {
        self.joined.push(universe);
    }
}

#[derive(Default)]
pub struct MockLlrp {
    pub probes: VecDeque<(Uid, Uid)>,
    pub replies: Vec<Uid>,
}

impl LlrpTransport for MockLlrp {
    fn receive(&mut self) -> Option<LlrpRequest<'_>> {
        let (lower, upper) = self.probes.pop_front()?;
        Some(LlrpRequest::Probe { lower, upper })
    }

    fn send_probe_reply(&mut self, uid: Uid) {
        self.replies.push(uid);
    }
}

#[derive(Default)]
pub struct MockRemote {
    pub requests: VecDeque<Vec<u8>>,
    pub replies: Vec<Vec<u8>>,
}

impl RemoteTransport for MockRemote {
    fn receive(&mut self, buf: &mut [u8]) -> Option<usize> {
        let request = self.requests.pop_front()?;
        let len = request.len().min(buf.len());
        buf[..len].copy_from_slice(&request[..len]);
        Some(len)
    }

    fn reply(&mut self, data: &[u8]) {
        self.replies.push(data.to_vec());
    }
}

// ============================================================================
// Mock Platform
// ============================================================================

pub struct MockPlatform {
    pub log: Log,
    pub clock: Rc<Cell<u64>>,
    /// Zeit, die ein Netzwerk-Durchlauf verbraucht
    pub network_ms: u64,
    /// Zeit, die ein Housekeeping-Durchlauf verbraucht (hängender Schritt)
    pub housekeeping_ms: u64,
    pub watchdog_deadline_ms: u64,
    pub watchdog: Option<SoftWatchdog>,
    pub watchdog_fired: bool,
    pub transport: MockTransport,
    pub llrp: MockLlrp,
    pub remote: MockRemote,
    pub startup: Vec<StartupStatus>,
    pub network: Option<NetworkConfig>,
    pub display: Option<DisplaySettings>,
    pub last_status: Option<NodeStatus>,
    pub reboot_request: bool,
    pub resets: usize,
}

impl MockPlatform {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            clock: Rc::new(Cell::new(0)),
            network_ms: 10,
            housekeeping_ms: 0,
            watchdog_deadline_ms: 2_000,
            watchdog: None,
            watchdog_fired: false,
            transport: MockTransport::default(),
            llrp: MockLlrp::default(),
            remote: MockRemote::default(),
            startup: Vec::new(),
            network: None,
            display: None,
            last_status: None,
            reboot_request: false,
            resets: 0,
        }
    }

    fn advance(&self, ms: u64) {
        self.clock.set(self.clock.get() + ms);
    }
}

impl Platform for MockPlatform {
    type Transport = MockTransport;
    type Llrp = MockLlrp;
    type Remote = MockRemote;

    fn init_network(&mut self, config: &NetworkConfig) {
        self.network = Some(config.clone());
    }

    fn configure_display(&mut self, settings: &DisplaySettings) {
        self.display = Some(*settings);
    }

    fn text_status(&mut self, status: StartupStatus) {
        self.startup.push(status);
    }

    fn init_watchdog(&mut self) {
        self.watchdog = Some(SoftWatchdog::new(
            self.watchdog_deadline_ms,
            self.clock.get(),
        ));
    }

    fn feed_watchdog(&mut self) {
        let now = self.clock.get();
        if let Some(wdt) = self.watchdog.as_mut() {
            if wdt.expired(now) {
                self.watchdog_fired = true;
                self.log.borrow_mut().push("watchdog".into());
            }
            wdt.feed(now);
        }
        self.log.borrow_mut().push("feed".into());
    }

    fn run_network(&mut self) {
        self.advance(self.network_ms);
        self.log.borrow_mut().push("network".into());
    }

    fn protocol(&mut self) -> &mut MockTransport {
        &mut self.transport
    }

    fn llrp(&mut self) -> &mut MockLlrp {
        &mut self.llrp
    }

    fn remote(&mut self) -> &mut MockRemote {
        &mut self.remote
    }

    fn run_housekeeping(&mut self, status: &NodeStatus) {
        self.advance(self.housekeeping_ms);
        self.last_status = Some(*status);
        self.log.borrow_mut().push("housekeeping".into());
    }

    fn take_reboot_request(&mut self) -> bool {
        std::mem::take(&mut self.reboot_request)
    }

    fn now_ms(&self) -> u64 {
        self.clock.get()
    }

    fn hardware_id(&self) -> [u8; 6] {
        [0x60, 0x55, 0xF9, 0x12, 0x34, 0x56]
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.log.borrow_mut().push("reset".into());
    }
}
