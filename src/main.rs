mod agent;
mod app;
mod assets;
mod config;
mod controller;
mod dice;
mod error;
mod landmark;
mod mood;
mod movement;
mod scenario;
mod scheduler;
mod session;
mod spatial;
mod sprite;
mod stage;
mod store;
mod timer;

#[cfg(test)]
mod testing;

fn main() {
    env_logger::init();
    log::info!("Catnap starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
