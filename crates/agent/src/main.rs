//! `heatload-agent` -- temperature sampling and store-and-forward daemon.
//!
//! Runs on the sensor node, samples the 1-Wire thermometer every interval
//! and relays each reading to the collector. Readings that cannot be
//! delivered are kept in a local queue file and resent later.
//!
//! ```text
//! heatload-agent            run the sampling loop
//! heatload-agent --reset    clear the local queue and exit
//! ```
//!
//! See [`AgentConfig::from_env`] for environment variables.

use std::path::Path;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heatload_agent::config::{self, AgentConfig};
use heatload_agent::probe::TcpProbe;
use heatload_agent::queue::PendingQueue;
use heatload_agent::sender::HttpDelivery;
use heatload_agent::sensor::{FixedSource, ReadingSource, W1Sensor, DEFAULT_W1_DEVICES_DIR};
use heatload_agent::transmitter::Transmitter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatload_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut reset = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--reset" => reset = true,
            other => bail!("unknown argument '{other}' (usage: heatload-agent [--reset])"),
        }
    }

    if reset {
        let queue = PendingQueue::new(config::queue_file_from_env());
        queue.clear().context("Failed to clear pending queue")?;
        tracing::info!(queue_file = %queue.path().display(), "Unsent data cleared");
        return Ok(());
    }

    let config = AgentConfig::from_env().context("Invalid agent configuration")?;
    tracing::info!(
        collector_url = %config.collector_url,
        queue_file = %config.queue_file.display(),
        interval_secs = config.sample_interval.as_secs(),
        "Starting heatload-agent"
    );

    let source: Box<dyn ReadingSource> = match (config.fixed_temperature, &config.sensor_path) {
        (Some(temperature), _) => {
            tracing::warn!(temperature, "Using a fixed temperature instead of the sensor");
            Box::new(FixedSource(temperature))
        }
        (None, Some(path)) => Box::new(W1Sensor::new(path)),
        (None, None) => Box::new(
            W1Sensor::discover(Path::new(DEFAULT_W1_DEVICES_DIR))
                .context("No temperature sensor available")?,
        ),
    };

    let probe = TcpProbe::new(config.probe_addr.clone(), config.probe_timeout);
    let delivery = HttpDelivery::new(config.collector_url.clone(), config.send_timeout)
        .context("Failed to build HTTP client")?;
    let queue = PendingQueue::new(config.queue_file.clone());

    Transmitter::new(source, probe, delivery, queue)
        .run(config.sample_interval)
        .await;
    Ok(())
}
