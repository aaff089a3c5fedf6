//! # Romi library.
//!
//! Motion control for a small differential drive robot. This library allows
//! the executable, benchmarks and tests to access the items defined in the
//! `romi_exec` crate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Closed loop controllers - wheel speed, line centroid and heading PI loops
pub mod ctrl;

/// Navigation commands and plans
pub mod cmd;

/// Command sequencer - executes a navigation plan using the controllers
pub mod seq;

/// Simulated robot used in place of the hardware
pub mod sim;

/// Motor characterisation from step responses
pub mod characterise;
