// WiFi Tasks - Station-Verbindung und embassy-net Runner
//
// Adresswechsel (DHCP/statisch) meldet das Board im Run-Loop.
use defmt::{Debug2Format, error, info, warn};
use embassy_net::Runner;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};

use crate::config::{WIFI_PASSWORD, WIFI_RECONNECT_DELAY_SECS, WIFI_SSID};

async fn backoff() {
    Timer::after(Duration::from_secs(WIFI_RECONNECT_DELAY_SECS)).await;
}

/// WiFi Connection Task
///
/// Startet den Controller im Station-Modus, verbindet mit `WIFI_SSID`
/// und verbindet nach jedem Disconnect neu. Solange keine Verbindung
/// besteht, empfängt der Node nichts; der Run-Loop läuft weiter.
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    info!("WiFi: connection task started");

    loop {
        if matches!(controller.is_started(), Ok(false)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );

            if let Err(e) = controller.set_config(&client_config) {
                error!("WiFi: set_config failed: {}", Debug2Format(&e));
                backoff().await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                error!("WiFi: start failed: {}", Debug2Format(&e));
                backoff().await;
                continue;
            }
            info!("WiFi: station started");
        }

        info!("WiFi: connecting to '{}'", WIFI_SSID);
        if let Err(e) = controller.connect_async().await {
            error!("WiFi: connect failed: {}", Debug2Format(&e));
            backoff().await;
            continue;
        }
        info!("WiFi: connected");

        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("WiFi: disconnected, reconnecting");
        Timer::after(Duration::from_secs(2)).await;
    }
}

/// Network Task
///
/// Prozessiert Netzwerk-Pakete (UDP, DHCP, IGMP) für alle Sockets
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
