//! Workroom LED strip plugin
//!
//! Colors an LED strip according to the temperature and relative humidity
//! published by remote sensor nodes, using a rule-set that can be replaced at
//! runtime over MQTT.
//!
//! Usage: cargo run -p ledstrip-plugin -- [-h HOST] [-p PORT] [-D]

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use ledstrip_rules_lib::Controller;
use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, Publish, QoS};

mod settings;
mod topics;

use settings::{Args, KEEP_ALIVE};

/// Capacity of the request queue between the client handle and the connection
const REQUEST_CAPACITY: usize = 10;

/// Pause before the connection is polled again after an error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.level_filter())
        .parse_default_env()
        .init();

    info!(
        "bc-workroom-led-strip {} connecting to {}:{}",
        env!("CARGO_PKG_VERSION"),
        args.host,
        args.port
    );

    let mut options = MqttOptions::new(args.client_id.as_str(), args.host.as_str(), args.port);
    options.set_keep_alive(KEEP_ALIVE);

    let (client, connection) = Client::new(options, REQUEST_CAPACITY);
    run(&client, connection);
    Ok(())
}

/// Drain the connection forever, handling one notification at a time
fn run(client: &Client, mut connection: Connection) {
    let mut controller = Controller::new();

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to MQTT broker ({:?})", ack.code);
                subscribe(client);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_publish(client, &mut controller, &publish);
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {e}");
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}

fn subscribe(client: &Client) {
    let filters = topics::subscription_filters();
    for filter in &filters {
        debug!("subscribe {}", filter.path);
    }
    // Same reason as for publishing: a blocking send here could wait on ourselves
    if let Err(e) = client.try_subscribe_many(filters) {
        error!("Failed to subscribe: {e}");
    }
}

fn handle_publish(client: &Client, controller: &mut Controller, publish: &Publish) {
    let topic = publish.topic.as_str();
    debug!("{topic}: {}", String::from_utf8_lossy(&publish.payload));

    let event = match topics::route(topic, &publish.payload) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(e) => {
            error!("Malformed payload on {topic}: {e}");
            return;
        }
    };

    for outbound in controller.handle(event, Instant::now()) {
        let message = match topics::to_message(&outbound, topic) {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to serialize {outbound:?}: {e}");
                continue;
            }
        };
        // The connection is drained on this thread, so never block on a full queue
        if let Err(e) =
            client.try_publish(message.topic.as_str(), QoS::AtMostOnce, false, message.payload)
        {
            warn!("Dropped publish to {}: {e}", message.topic);
        }
    }
}
