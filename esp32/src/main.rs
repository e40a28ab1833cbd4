use anyhow::Context;
use chrono::FixedOffset;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{Gpio2, Output, PinDriver};
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use climate_node_common::dht::DhtKind;
use climate_node_common::{NodeConfig, NodeParts, Scheduler, TelemetryNode};

mod clock;
mod dht;
mod http;
mod wifi;

use clock::{BootClock, SntpClock};
use dht::Dht;
use http::EspTransport;
use wifi::EspRadio;

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

const DHT_KIND: DhtKind = DhtKind::Dht11;
const DHT_PIN: i32 = 4;

/// Offset used only to print the boot-time clock probe in local time.
const LOCAL_UTC_OFFSET_SECS: i32 = -3 * 3600;

type Node = TelemetryNode<EspRadio, Dht, SntpClock, EspTransport, PinDriver<'static, Gpio2, Output>, FreeRtos>;

/// Settings baked in at build time, e.g. `COLLECTOR_URL=http://10.0.0.5:5000/data cargo build`.
fn build_setting(key: &str) -> Option<&'static str> {
    match key {
        "DEVICE_ID" => option_env!("DEVICE_ID"),
        "COLLECTOR_URL" => option_env!("COLLECTOR_URL"),
        "READING_INTERVAL_MS" => option_env!("READING_INTERVAL_MS"),
        "TEMP_MIN_ALERTA" => option_env!("TEMP_MIN_ALERTA"),
        "TEMP_MAX_ALERTA" => option_env!("TEMP_MAX_ALERTA"),
        "TEMP_MIN_CRITICO" => option_env!("TEMP_MIN_CRITICO"),
        "TEMP_MAX_CRITICO" => option_env!("TEMP_MAX_CRITICO"),
        "UMID_MIN_ALERTA" => option_env!("UMID_MIN_ALERTA"),
        "UMID_MAX_ALERTA" => option_env!("UMID_MAX_ALERTA"),
        "UMID_MIN_CRITICO" => option_env!("UMID_MIN_CRITICO"),
        "UMID_MAX_CRITICO" => option_env!("UMID_MAX_CRITICO"),
        _ => None,
    }
}

fn node_config() -> anyhow::Result<NodeConfig> {
    let mut config = NodeConfig::default();
    config.apply_overrides(|key| build_setting(key).map(str::to_string))?;
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    EspLogger::initialize_default();

    info!("=== ESP32 climate node ===");
    let config = node_config()?;
    info!("Device: {}", config.device_id);
    info!("Collector: {}", config.endpoint);
    info!("Sensor: {} on GPIO{}", DHT_KIND.name(), DHT_PIN);

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let radio = EspRadio::new(peripherals.modem, sys_loop, nvs, SSID, PASSWORD)
        .context("wifi startup failed")?;
    let led = PinDriver::output(peripherals.pins.gpio2).context("status LED on GPIO2")?;

    let mut node: Node = TelemetryNode::new(
        &config,
        NodeParts {
            radio,
            sensor: Dht::new(DHT_KIND, DHT_PIN),
            clock: SntpClock::new(),
            transport: EspTransport::new(config.http_timeout()),
            led,
            delay: FreeRtos,
        },
    );

    if !node.ensure_link().is_up() {
        warn!("No network at boot; the loop keeps retrying");
    }

    match node.wall_time() {
        Some(now) => match FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECS) {
            Some(offset) => info!("Local time: {}", now.with_timezone(&offset)),
            None => info!("UTC time: {now}"),
        },
        None => warn!("Time not synchronised yet; readings go out without a timestamp"),
    }

    let mut scheduler = Scheduler::new(
        BootClock,
        FreeRtos,
        config.interval_ms,
        config.poll_interval_ms,
    );
    scheduler.run(&mut node)
}
