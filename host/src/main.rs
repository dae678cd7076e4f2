use anyhow::Context;
use envsense_common::{Publisher, Sampler, Scheduler};
use envsense_host::{HostSettings, SimulatedBme680, StdClock, UreqTransport};

/// The telemetry node as it runs on the desktop.
///
/// Holds the scheduler, which owns the sampler (simulated BME680) and the publisher
/// (`ureq` transport).
struct App {
    scheduler: Scheduler<SimulatedBme680, UreqTransport, StdClock>,
    cycles: Option<u64>,
}

impl App {
    /// Create a new App struct.
    ///
    /// Fails if the sensor cannot be configured, in which case the loop is never entered.
    fn new(settings: HostSettings) -> anyhow::Result<Self> {
        let config = settings.telemetry;
        let clock = StdClock::new();

        let mut sensor = SimulatedBme680::new();
        if let Some(measurements) = settings.fail_after {
            sensor = sensor.fail_after(measurements);
        }
        log::info!("Init simulated BME680");
        let sampler =
            Sampler::new(sensor, config.heater, clock).context("Sensor initialization failed")?;

        let publisher = Publisher::new(UreqTransport::new(), &config);
        log::info!(
            "Pushing to {} every {} s",
            publisher.endpoint().url(),
            config.period.as_secs_f32()
        );

        Ok(Self {
            scheduler: Scheduler::new(&config, sampler, publisher, clock),
            cycles: settings.cycles,
        })
    }

    /// Run the loop, forever unless a number of cycles was configured.
    fn run(&mut self) -> anyhow::Result<()> {
        match self.cycles {
            Some(cycles) => {
                let stats = self.scheduler.run_cycles(cycles)?;
                log::info!(
                    "Finished {} cycles, {} failed pushes, {} overruns",
                    stats.cycles,
                    stats.publish_failures,
                    stats.overruns
                );
                Ok(())
            }
            None => match self.scheduler.run() {
                Ok(never) => match never {},
                Err(err) => Err(err.into()),
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = HostSettings::from_env()?;
    let mut app = App::new(settings)?;

    app.run()
}
