extern crate gyre;
extern crate pretty_env_logger;

mod earth;
mod exec;
mod force;
mod props;
mod scenarios;

use std::path::PathBuf;

use gyre::FdmExec;

/// The directory holding the aircraft, engine and system documents used by the tests.
pub fn data_dir() -> PathBuf {
    PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or(".".to_string())).join("data")
}

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// An executive rooted in the test data directory with `aircraft` loaded.
pub fn load_aircraft(aircraft: &str) -> FdmExec {
    init_logger();
    let mut fdm = FdmExec::new().unwrap();
    fdm.set_root_dir(data_dir());
    fdm.load_model(aircraft).unwrap();
    fdm
}
