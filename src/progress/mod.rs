//! Campaign progress tracking.
//!
//! - `session`: the shared record of which enrollment is being tracked and since when
//! - `simulator`: pure mapping from elapsed time to a progress reading
//! - `scheduler`: the per-surface loop that recomputes readings and signals completion
//! - `ticker`: cancellable periodic timer and task ownership
//! - `clock`: injectable wall-clock sources

pub mod clock;
pub mod scheduler;
pub mod session;
pub mod simulator;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{
    LoopCore, LoopHandle, LoopSettings, LoopState, ProgressLoop, ProgressObserver, Step,
};
pub use session::{ActiveSession, ProgressSession, SessionSnapshot};
pub use simulator::{ProgressEstimate, ProgressReading, simulate};
