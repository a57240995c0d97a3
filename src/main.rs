use log::error;
use crate::initialization::init;

mod config;
mod errors;
mod initialization;
mod logging;
mod manager_mqtt;
mod manager_trafikverket;
mod models;
mod report;
mod tile_color;
mod weather;
mod worker;

fn main() -> anyhow::Result<()> {
    let (config, mut mgr, _log_handle) = init()?;

    worker::run(&config, &mut mgr);

    if let Err(e) = mgr.mqtt.close() {
        error!("{}", e);
    }

    Ok(())
}
