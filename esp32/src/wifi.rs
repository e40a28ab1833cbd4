use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use climate_node_common::Radio;

/// The station interface, configured once and reconnected on demand.
pub struct EspRadio {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl EspRadio {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("wifi ssid too long"))?,
            password: password
                .try_into()
                .map_err(|_| anyhow::anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("Wifi started, station `{ssid}`");

        Ok(Self { wifi })
    }

    pub fn ip_info(&self) -> Option<String> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|ip| format!("{}", ip.ip))
    }
}

impl Radio for EspRadio {
    type Error = EspError;

    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn connect(&mut self) -> Result<(), EspError> {
        if let Err(e) = self.wifi.disconnect() {
            // Not associated yet; nothing to tear down.
            log::debug!("Wifi disconnect before connect: {e}");
        }
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        match self.ip_info() {
            Some(ip) => info!("Wifi netif up, IP {ip}"),
            None => warn!("Wifi netif up, but no IP info"),
        }
        Ok(())
    }
}
