//! Walks through the hub operations against a configured hub.
//!
//! Run with `cargo run --example basic`; set `BROADCAST__LOGGING__LEVEL=debug`
//! to see the hub's own tracing output.

use broadcast::config::load_config;
use broadcast::utils::logging;
use broadcast::{Hub, Listener};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&config.logging);

    let hub: Hub<&'static str, String> = Hub::with_settings(config.hub);
    let mut failures = hub.failures();

    let greet = Listener::new(|values: &[String]| info!("once: {values:?}"));
    let every = Listener::new(|values: &[String]| info!("every: {values:?}"));
    hub.subscribe_once("greeting", &greet);
    hub.subscribe_all("greeting", &every);

    hub.resolve("greeting", "hello".to_string());
    hub.resolve("greeting", "hello again".to_string());

    let later = hub.resolver("done");
    tokio::spawn(async move {
        later.resolve("finished".to_string());
    });
    match hub.wait_for("done").await {
        Ok(values) => info!("done: {values:?}"),
        Err(e) => error!("done never resolved: {e}"),
    }

    hub.cancel("greeting", every.id());
    hub.subscribe_once("boom", &Listener::new(|_: &[String]| panic!("demo failure")));
    hub.resolve("boom", String::new());
    hub.flush().await;

    if let Ok(failure) = failures.try_recv() {
        info!("listener {} failed on {:?}: {}", failure.listener, failure.topic, failure.message);
    }
}
