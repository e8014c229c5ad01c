pub mod config;
pub mod enrollment;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod progress;
pub mod ui;
