//! Data passed into and out of the sequencer each cycle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use crate::cmd::CmdMode;
use util::time::Ticks;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and heading of the robot in the course frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Units: mm
    pub position_mm: Vector2<f64>,

    /// Angle of the robot's forward axis from the +x axis, positive
    /// counter-clockwise.
    ///
    /// Units: radians
    pub heading_rad: f64
}

/// One cycle's worth of sensor data.
#[derive(Debug, Clone, Copy)]
pub struct SensorFrame {
    /// Tick counter reading at which the sensors were sampled.
    ///
    /// Units: microseconds
    pub ticks: Ticks,

    /// Left encoder velocity.
    ///
    /// Units: counts/second
    pub left_enc_cps: f64,

    /// Right encoder velocity.
    ///
    /// Units: counts/second
    pub right_enc_cps: f64,

    /// Line centroid offset from the centre of the IR array, positive to the
    /// right, or `None` if no line is seen.
    ///
    /// Units: mm
    pub centroid_mm: Option<f64>,

    /// Current pose estimate.
    pub pose: Pose,

    /// Signed distance travelled since start up, forward positive.
    ///
    /// Units: mm
    pub dist_mm: f64,

    /// True while the bump switch is pressed.
    pub bump: bool,

    /// Measured battery voltage if sampled this cycle.
    ///
    /// Units: volts
    pub v_bat: Option<f64>
}

/// Motor effort demands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DriveDems {
    /// Units: percent, positive forward
    pub left_effort_pct: f64,

    /// Units: percent, positive forward
    pub right_effort_pct: f64
}

/// Status report for sequencer processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Index of the command executing at the end of the cycle.
    pub cmd_index: usize,

    /// Mode of the command executing at the end of the cycle.
    pub mode: Option<CmdMode>,

    /// The value compared against the end condition this cycle.
    pub end_state: f64,

    /// Units: mm/s
    pub left_target_mms: f64,

    /// Units: mm/s
    pub right_target_mms: f64,

    /// Steering differential, positive turns counter-clockwise.
    ///
    /// Units: mm/s
    pub steer_diff_mms: f64,

    /// A command finished this cycle.
    pub cmd_complete: bool,

    /// The whole plan has been completed.
    pub plan_complete: bool,

    /// The executing command ran for longer than the timeout and the plan
    /// was aborted.
    pub cmd_timed_out: bool,

    /// Following a line but none was seen this cycle.
    pub line_lost: bool
}

impl Pose {
    pub fn new(x_mm: f64, y_mm: f64, heading_rad: f64) -> Self {
        Self {
            position_mm: Vector2::new(x_mm, y_mm),
            heading_rad
        }
    }
}

impl DriveDems {
    /// Demand both motors stop.
    pub fn stop() -> Self {
        Self::default()
    }
}
