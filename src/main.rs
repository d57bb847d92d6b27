//!
//! #  RidePool - ride sharing coordination backend
//!
//! Drivers publish rides with a number of seats, passengers ask to join,
//! and the driver decides who comes along.
//!
//! RidePool keeps track of:
//!
//! * Who asked for which seats, and who got them
//! * Who showed up when the ride started
//! * Who was dropped off, and who was never marked
//! * Every rider's history across all rides
//!

#[macro_use] extern crate rocket;

mod routes;
mod store;
mod engine;
mod config;

use anyhow::{anyhow, Context};
use rocket::{Build, Rocket};

use config::config::ConfyConfig;
use engine::RideEngine;
use routes::EngineState;
use store::EntityStore;
use store::models::RIDE;

use log::{error, info, warn};


/// Mounts the routes and hands the engine to rocket
pub fn build_rocket(engine: RideEngine) -> Rocket<Build> {
    rocket::build()
        .mount("/", routes::routes())
        .register("/", routes::catchers())
        .manage(EngineState::new(engine))
}

/// Loads the store named by the config and wraps it in an engine,
/// an empty `data_file` keeps everything in memory
pub fn build_engine(config: &ConfyConfig) -> anyhow::Result<RideEngine> {
    let store = if config.data_file.trim().is_empty() {
        warn!("No data_file configured, nothing will be written to disk");
        EntityStore::in_memory()
    } else {
        EntityStore::open(&config.data_file)
            .with_context(|| format!("could not load the store from {}", config.data_file))?
    };
    let engine = RideEngine::new(store);
    let rides = engine.store().get(RIDE).map_or(0, |r| r.len());
    info!("{}", format!("Store ready at '{}' with {} rides", config.data_file, rides));
    Ok(engine)
}

/// The main functions, runs w/ cargo run
#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = config::config::init().context("CONFIG failed to launch")?;
    config::config::setup_logger(&config).context("LOGGER failed to launch")?;

    let engine = match build_engine(&config) {
        Err(e) => {
            error!("{}", format!("{:#}", e));
            return Err(e);
        },
        Ok(value) => value,
    };
    warn!("RIDEPOOL IS LAUNCHING");

    let lift = build_rocket(engine).launch().await;

    warn!("RIDEPOOL OVER");
    match lift {
        Ok(_) => Ok(()),
        Err(value) => {
            error!("Rocket could not run, error {}", value);
            Err(anyhow!("rocket could not run: {}", value))
        }
    }
}
