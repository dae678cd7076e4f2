mod clock;
mod config;
mod http;
mod sensor;
mod wifi;

use anyhow::anyhow;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2c::{config::Config as I2cConfig, I2cDriver};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use log::info;

use envsense_common::{Publisher, Sampler, Scheduler, TelemetryConfig};

use crate::clock::EspClock;
use crate::http::EspHttpTransport;
use crate::sensor::Bme680Sensor;

/// Stack size of the sensor task.
const SENSOR_TASK_STACK_SIZE: usize = 8192;

/// The telemetry loop. Returns only when the sensor fails.
fn sensor_task(sensor: Bme680Sensor, config: TelemetryConfig) -> anyhow::Result<()> {
    let clock = EspClock;
    let sampler = Sampler::new(sensor, config.heater, clock)?;
    let publisher = Publisher::new(EspHttpTransport, &config);
    let mut scheduler = Scheduler::new(&config, sampler, publisher, clock);

    match scheduler.run() {
        Ok(never) => match never {},
        Err(err) => Err(err.into()),
    }
}

fn run() -> anyhow::Result<()> {
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi::connect(&mut wifi)?;
    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("Wifi DHCP info: {:?}", ip_info);
    info!("Connected to AP, begin humidity sensor");

    let config = config::telemetry()?;
    let address = config::sensor_address()?;
    let (sda, scl) = config::sensor_pins()?;

    // BME680 on I2C port 0
    // SAFETY: nothing else takes these pins out of `peripherals.pins`.
    let (sda_pin, scl_pin) = unsafe { (AnyIOPin::new(sda.into()), AnyIOPin::new(scl.into())) };
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda_pin,
        scl_pin,
        &I2cConfig::new().baudrate(100_000.Hz()),
    )?;
    info!("Init BME 680 at {:#x} port 0, SDA {} SCL {}", address, sda, scl);
    let sensor = Bme680Sensor::new(i2c, address)?;

    let task = std::thread::Builder::new()
        .name("bme680_read".into())
        .stack_size(SENSOR_TASK_STACK_SIZE)
        .spawn(move || sensor_task(sensor, config))?;

    // Wi-Fi has to stay up for as long as the task runs.
    let result = task
        .join()
        .map_err(|_| anyhow!("Sensor task panicked"))?;
    drop(wifi);
    result
}

fn main() {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    EspLogger::initialize_default();

    if let Err(err) = run() {
        log::error!("{:#}", err);
        // The sensor is initialized from scratch after the reset.
        esp_idf_svc::hal::reset::restart();
    }
}
