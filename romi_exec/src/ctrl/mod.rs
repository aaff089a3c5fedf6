//! # Closed loop controllers
//!
//! This module provides the PI controllers used to drive the robot. All of
//! them are configurations of a single generic [`PiController`], which is
//! parameterised by:
//!
//! - The unit conversion constants `k1` (target to error units), `k2`
//!   (measurement to error units) and `k3` (error to actuator units).
//! - The output saturation limits.
//! - An [`InputFilter`] policy applied to the raw error each cycle.
//!
//! The three channels are:
//!
//! - [`WheelSpeedCtrl`] - a wheel speed target in mm/s and an encoder
//!   velocity in counts/s to an effort percentage. Rejects encoder spikes and
//!   can compensate for battery droop.
//! - [`LineCentroidCtrl`] - a line centroid offset in mm to a wheel speed
//!   differential in mm/s.
//! - [`HeadingCtrl`] - a heading error in radians to a wheel speed
//!   differential in mm/s.
//!
//! While the output of a controller is saturated in the same direction as its
//! error the last integral step is undone, so the integral does not wind up.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filter;
mod heading;
mod line_centroid;
mod params;
mod pi;
mod wheel_speed;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use filter::*;
pub use heading::*;
pub use line_centroid::*;
pub use params::*;
pub use pi::*;
pub use wheel_speed::*;

use util::time::Ticks;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The interface shared by all controllers.
pub trait Controller {
    /// Replace the setpoint. The accumulated error is unchanged.
    fn set_target(&mut self, target: f64);

    /// The current setpoint.
    fn target(&self) -> f64;

    /// Set the proportional and integral gains, rejecting non-finite gains.
    fn set_gains(&mut self, k_p: f64, k_i: f64) -> Result<(), CtrlError>;

    /// Set the output limits, rejecting `min_sat > max_sat` or non-finite
    /// limits.
    fn set_saturation(&mut self, min_sat: f64, max_sat: f64) -> Result<(), CtrlError>;

    /// Allow the accumulated error to evolve and contribute to the output.
    fn enable_integral(&mut self);

    /// Freeze the accumulated error and remove it from the output.
    fn disable_integral(&mut self);

    /// Forget the last tick reading, so the next call to `get_action` is
    /// treated as a first call and nothing is integrated across the gap. The
    /// accumulated error is kept and still contributes to that call's output.
    fn rearm(&mut self);

    /// Calculate the control signal for a measurement taken at `ticks`
    /// (microseconds). The result is always within the saturation limits.
    fn get_action(&mut self, ticks: Ticks, measured: f64) -> f64;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Invalid controller configurations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CtrlError {
    #[error("Invalid saturation limits, min ({min_sat}) must be finite and no greater than max ({max_sat})")]
    InvalidSaturation {
        min_sat: f64,
        max_sat: f64
    },

    #[error("Controller parameter {0} must be finite, found {1}")]
    NonFiniteParam(&'static str, f64),

    #[error("The spike rejection band must be positive, found {0}")]
    InvalidSpikeBand(f64),

    #[error("Battery voltage must be positive, found {0} V")]
    InvalidBatteryVoltage(f64)
}
