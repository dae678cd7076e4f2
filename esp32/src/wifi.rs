use anyhow::anyhow;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

type Wifi = BlockingWifi<EspWifi<'static>>;

/// Connects to the configured access point and waits until the network interface is up.
pub fn connect(wifi: &mut Wifi) -> anyhow::Result<()> {
    use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
    use log::info;

    let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
        ssid: SSID
            .try_into()
            .map_err(|_| anyhow!("WIFI_SSID is longer than 32 bytes"))?,
        bssid: None,
        auth_method: AuthMethod::WPA2Personal,
        password: PASSWORD
            .try_into()
            .map_err(|_| anyhow!("WIFI_PASS is longer than 64 bytes"))?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;

    wifi.start()?;
    info!("Wifi started");

    wifi.connect()?;
    info!("Wifi connected");

    wifi.wait_netif_up()?;
    info!("Wifi netif up");

    Ok(())
}
