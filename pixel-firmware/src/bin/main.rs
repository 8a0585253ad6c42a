// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

// Heap Allocator (WiFi und Pixel-Buffer)
extern crate alloc;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use esp_storage::FlashStorage;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

use esp_pixel_node::config::{
    CONFIG_STORE_OFFSET, DEVICE_LABEL, EXTRA_HEAP_SIZE, MAX_PIXELS_PER_PORT, PROTOCOL,
    RMT_BUFFER_SIZE, RMT_CLOCK_MHZ, VERSION, WIFI_HEAP_SIZE,
};
use esp_pixel_node::hal::{RmtLedWriter, StatusLed};
use esp_pixel_node::{Board, Radio, mk_static};
use pixel_core::{NodeRuntime, RuntimeConfig, StripDriver};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, baut das Board und startet den Runtime.
/// Danach läuft der Run-Loop hier in `main`; zwischen zwei Durchläufen
/// bekommen WiFi-, Netz- und mDNS-Task die CPU.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Zwei Bereiche: reclaimed RAM (64 KB) + extra (48 KB)
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime (TIMG0 + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    info!("Main: pixel node {} starting", VERSION);

    // WiFi Hardware; der Stack entsteht erst im Runtime (IP aus dem Config Store)
    let radio_init = mk_static!(
        esp_radio::Controller,
        esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller")
    );
    let (controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");
    let radio = Radio {
        controller,
        device: interfaces.sta,
    };

    // Random seed für den TCP/IP Stack (Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // Pixel-Ports: RMT Channel 0 → GPIO4, Channel 1 → GPIO5
    let rmt = Rmt::new(peripherals.RMT, Rate::from_mhz(RMT_CLOCK_MHZ))
        .expect("Failed to initialize RMT");
    let port0 = SmartLedsAdapter::new(
        rmt.channel0,
        peripherals.GPIO4,
        mk_static!(
            [PulseCode; RMT_BUFFER_SIZE],
            smart_led_buffer!(MAX_PIXELS_PER_PORT)
        ),
    );
    let port1 = SmartLedsAdapter::new(
        rmt.channel1,
        peripherals.GPIO5,
        mk_static!(
            [PulseCode; RMT_BUFFER_SIZE],
            smart_led_buffer!(MAX_PIXELS_PER_PORT)
        ),
    );
    let driver = StripDriver::new(
        [RmtLedWriter::new(port0), RmtLedWriter::new(port1)],
        MAX_PIXELS_PER_PORT,
    );

    // Status-LED (GPIO15), BOOT-Taster (GPIO9), Watchdog (TIMG1)
    let status_led = StatusLed::new(Output::new(
        peripherals.GPIO15,
        Level::Low,
        OutputConfig::default(),
    ));
    let button = Input::new(
        peripherals.GPIO9,
        InputConfig::default().with_pull(Pull::Up),
    );
    let watchdog = TimerGroup::new(peripherals.TIMG1).wdt;

    let board = Board::new(
        spawner, PROTOCOL, radio, seed, watchdog, status_led, button,
    );
    let flash = FlashStorage::new(peripherals.FLASH);

    let runtime_config = RuntimeConfig {
        protocol: PROTOCOL,
        label: DEVICE_LABEL,
        version: VERSION,
    };
    let mut runtime =
        match NodeRuntime::start(board, driver, flash, CONFIG_STORE_OFFSET, runtime_config) {
            Ok(runtime) => runtime,
            Err(e) => {
                // Statusanzeige steht auf Error, Watchdog ist nicht aktiv
                error!("Main: start failed: {}", e);
                loop {
                    Timer::after(Duration::from_secs(3600)).await;
                }
            }
        };

    loop {
        runtime.tick();
        yield_now().await;
    }
}
