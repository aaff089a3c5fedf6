//! Line centroid controller
//!
//! Steers the robot so the line sits at the target position on the IR sensor
//! array. Target and measurement are both centroid offsets in mm from the
//! centre of the array (positive to the right), and the output is a wheel
//! speed differential in mm/s. The centroid is filtered by the sensor
//! processing, so no spike rejection is applied.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{CtrlError, LineCentroidParams, PassThrough, PiConfig, PiController, Scaling};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Line centroid controller, mm of centroid offset to mm/s of differential.
pub type LineCentroidCtrl = PiController<PassThrough>;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a new line centroid controller targeting the centre of the array.
pub fn new_line_centroid_ctrl(params: &LineCentroidParams) -> Result<LineCentroidCtrl, CtrlError> {
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
