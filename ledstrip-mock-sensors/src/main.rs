//! Mock remote sensor nodes for testing the LED strip plugin
//!
//! Publishes a thermometer and a humidity sensor reading at a fixed interval.
//! Both values ramp between a low and a high level so every default rule gets
//! its turn.
//!
//! Usage: cargo run -p ledstrip-mock-sensors -- [-h HOST] [-p PORT]

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{ArgAction, Parser};
use ledstrip_rules_lib::Channel;
use log::{debug, error, info, LevelFilter};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde_json::json;

const THERMOMETER_TOPIC: &str = "nodes/remote/thermometer/i2c0-49";
const HUMIDITY_TOPIC: &str = "nodes/remote/humidity-sensor/i2c0-40";

#[derive(Parser, Debug)]
#[command(name = "ledstrip-mock-sensors", version)]
#[command(about = "Publish synthetic temperature and humidity telemetry")]
#[command(disable_help_flag = true)]
struct Args {
    /// MQTT broker host
    #[arg(short = 'h', long, default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[arg(short, long, default_value = "1883")]
    port: u16,

    /// Seconds between readings
    #[arg(short, long, default_value = "5")]
    interval: u64,

    /// Seconds for one full low-high-low cycle
    #[arg(short, long, default_value = "120")]
    cycle: f64,

    /// Print debug messages
    #[arg(short = 'D', long)]
    debug: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

/// Ramp up, hold, ramp down, hold. `phase` is the position within the cycle
/// in `0.0..1.0`.
fn ramp(phase: f64, low: f64, high: f64) -> f64 {
    const RAMP: f64 = 0.35;
    const HOLD: f64 = 0.15;

    let level = if phase < RAMP {
        phase / RAMP
    } else if phase < RAMP + HOLD {
        1.0
    } else if phase < 2.0 * RAMP + HOLD {
        1.0 - (phase - RAMP - HOLD) / RAMP
    } else {
        0.0
    };

    low + (high - low) * level
}

/// Readings at `elapsed` seconds into the run. Humidity runs half a cycle
/// behind temperature so the two extremes do not coincide.
fn readings(elapsed: f64, cycle: f64) -> (f64, f64) {
    let phase = (elapsed / cycle).fract();
    let temperature = ramp(phase, 18.0, 28.0);
    let humidity = ramp((phase + 0.5).fract(), 25.0, 65.0);
    (round_tenth(temperature), round_tenth(humidity))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if args.cycle <= 0.0 {
        anyhow::bail!("cycle must be positive");
    }

    let mut options = MqttOptions::new("ledstrip-mock-sensors", args.host.as_str(), args.port);
    options.set_keep_alive(Duration::from_secs(10));
    let (client, mut connection) = Client::new(options, 10);

    let broker = format!("{}:{}", args.host, args.port);
    std::thread::spawn(move || {
        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to {broker}");
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT connection error: {e}");
                    std::thread::sleep(Duration::from_secs(1));
                }
            }
        }
    });

    let start = Instant::now();
    let interval = Duration::from_secs(args.interval.max(1));
    loop {
        let (temperature, humidity) = readings(start.elapsed().as_secs_f64(), args.cycle);
        debug!("temperature={temperature} relative-humidity={humidity}");

        let temperature_key = Channel::Temperature.key();
        let humidity_key = Channel::RelativeHumidity.key();
        let thermometer = json!({ temperature_key: [temperature, "\u{2103}"] });
        let hygrometer = json!({ humidity_key: [humidity, "%"] });
        client.publish(THERMOMETER_TOPIC, QoS::AtMostOnce, false, thermometer.to_string())?;
        client.publish(HUMIDITY_TOPIC, QoS::AtMostOnce, false, hygrometer.to_string())?;

        std::thread::sleep(interval);
    }
}
