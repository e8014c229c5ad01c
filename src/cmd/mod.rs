//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `phases`    | `Phases`         |
//! | `simulate`  | `Simulate`       |
//! | `track`     | `Track`          |
//! | `enroll`    | `Enroll`         |
//! | `config`    | `Config`         |

pub mod config;
pub mod enroll;
pub mod phases;
pub mod simulate;
pub mod track;

pub use config::cmd_config;
pub use enroll::cmd_enroll;
pub use phases::cmd_phases;
pub use simulate::cmd_simulate;
pub use track::cmd_track;
