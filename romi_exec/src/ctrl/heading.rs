//! Heading controller
//!
//! Target and measurement are both in radians. The target is normally held at
//! zero and the caller passes the heading offset (current heading minus the
//! desired heading, wrapped to +-pi) as the measurement each cycle, so the
//! error is the angle the robot still has to turn through counter-clockwise.
//! The output is a wheel speed differential in mm/s.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{CtrlError, HeadingParams, PassThrough, PiConfig, PiController, Scaling};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Heading controller, radians of heading error to mm/s of differential.
pub type HeadingCtrl = PiController<PassThrough>;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a new heading controller with a zero target.
pub fn new_heading_ctrl(params: &HeadingParams) -> Result<HeadingCtrl, CtrlError> {
    PiController::new(
        PiConfig {
            target: 0.0,
            k_p: params.k_p,
            k_i: params.k_i,
            min_sat: params.min_sat,
            max_sat: params.max_sat,
            scaling: Scaling::with_k3(params.k3),
            use_integral: params.use_integral
        },
        PassThrough
    )
}
