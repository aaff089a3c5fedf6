//! # Command sequencer
//!
//! The sequencer executes a [`NavPlan`](crate::cmd::NavPlan) one command at a
//! time. Each cycle it:
//!
//! 1. Calculates the end state of the executing command from the sensor frame
//!    and moves on to the next command if the end condition is met.
//! 2. Picks a linear speed and a steering differential for the command's
//!    mode, using the line centroid or heading controller for the
//!    differential.
//! 3. Splits these into left (`speed - diff`) and right (`speed + diff`) wheel
//!    speed targets and runs the wheel speed controllers to get the motor
//!    efforts.
//!
//! The steering controllers are rebuilt and the wheel controllers rearmed at
//! each command boundary.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use frame::*;
pub use params::*;
pub use state::*;

use crate::ctrl::CtrlError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during sequencer operation.
#[derive(Debug, thiserror::Error)]
pub enum SeqError {
    #[error("A plan is already executing, it must finish or be aborted before a new one can begin")]
    PlanAlreadyExecuting,

    #[error("Command timeout must be finite and positive, found {0}")]
    InvalidTimeout(f64),

    #[error("Position follow command {0} has no target")]
    MissingTarget(usize),

    #[error("Invalid controller configuration: {0}")]
    CtrlError(#[from] CtrlError),

    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] ArchiveError)
}
