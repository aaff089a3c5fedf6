//! Cyclic module interface
//!
//! A cyclic module is initialised once and then processed once per control
//! cycle with that cycle's input. The command sequencer is one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A module run from the control loop.
pub trait State {
    /// Data needed to start the module, e.g. the plan to execute.
    type InitData;
    type InitError;

    /// One cycle's worth of input.
    type InputData;
    /// One cycle's worth of output, e.g. actuator demands.
    type OutputData;
    /// Monitoring quantities and flags for the cycle.
    type StatusReport;
    type ProcError;

    /// Initialise the module.
    ///
    /// `session` gives the location of the session's archives.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session
    ) -> Result<(), Self::InitError>;

    /// Process one control cycle.
    ///
    /// Returns the cycle's output and a report on the processing. A module
    /// that has nothing to do shall still return a safe output.
    fn proc(
        &mut self,
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
