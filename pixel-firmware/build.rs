// Build-Script: WiFi-Credentials einbacken, Linker-Skripte für ESP32-C6

fn main() {
    // Ohne .env müssen WIFI_SSID / WIFI_PASSWORD in der Umgebung stehen
    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=.env nicht geladen ({e}), nutze Environment");
    }

    // config.rs liest die Credentials per env!
    for key in ["WIFI_SSID", "WIFI_PASSWORD"] {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    // defmt Log-Format
    println!("cargo:rustc-link-arg=-Tdefmt.x");
    // Memory-Layout und Startup, muss als letztes kommen
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
