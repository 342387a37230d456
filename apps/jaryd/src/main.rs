//! Jary CLI (`jaryd`) - standalone binary.
//!
//! Thin wrapper around [`jaryd::run_cli`]; all logic lives in the
//! library half for testability. Initializes the logger the library
//! crates only ever emit into.

fn main() {
    env_logger::init();
    std::process::exit(jaryd::run_cli());
}
