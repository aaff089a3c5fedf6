//! # Simulated robot
//!
//! A simple plant model used to exercise the sequencer and controllers
//! without hardware. Each motor is modelled as a first order lag from effort
//! to encoder velocity, scaled by the battery voltage. The robot drives on a
//! flat course with a straight line painted along the x axis and an optional
//! wall across the course at a fixed x.
//!
//! The tick counter starts just short of its limit so that every run crosses
//! the counter overflow.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::seq::{DriveDems, Pose, SensorFrame};
use util::{
    maths::{clamp, wrap_pi},
    time::{self, Ticks}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical parameters of the simulated robot and course.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Distance between the wheel contact points.
    ///
    /// Units: mm
    pub wheel_base_mm: f64,

    /// Units: mm
    pub wheel_radius_mm: f64,

    /// Encoder counts per wheel revolution.
    pub counts_per_rev: f64,

    /// Steady state encoder velocity per percent of effort at the nominal
    /// battery voltage.
    ///
    /// Units: (counts/second) / %
    pub motor_gain_cps: f64,

    /// Motor time constant.
    ///
    /// Units: seconds
    pub motor_tau_s: f64,

    /// Units: volts
    pub v_nom: f64,

    /// Units: volts
    pub v_bat: f64,

    /// Half width of the IR sensor array, lines further from the centre than
    /// this are not seen.
    ///
    /// Units: mm
    pub ir_half_width_mm: f64,

    /// Position of a wall across the course, if any.
    ///
    /// Units: mm
    pub wall_x_mm: Option<f64>,

    /// Pose at the start of the simulation.
    pub start_x_mm: f64,
    pub start_y_mm: f64,
    pub start_heading_rad: f64,

    /// Tick counter reading at the start of the simulation.
    pub start_ticks: Ticks
}

/// The simulated robot.
#[derive(Debug, Clone)]
pub struct Sim {
    params: SimParams,

    ticks: Ticks,
    pose: Pose,
    dist_mm: f64,

    left_cps: f64,
    right_cps: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            wheel_base_mm: 141.0,
            wheel_radius_mm: 35.0,
            counts_per_rev: 1440.0,
            motor_gain_cps: 66.7,
            motor_tau_s: 0.05,
            v_nom: 9.0,
            v_bat: 9.0,
            ir_half_width_mm: 30.0,
            wall_x_mm: None,
            start_x_mm: 0.0,
            start_y_mm: 0.0,
            start_heading_rad: 0.0,
            start_ticks: Ticks::MAX - 500_000
        }
    }
}

impl Sim {
    pub fn new(params: SimParams) -> Self {
        Self {
            ticks: params.start_ticks,
            pose: Pose::new(params.start_x_mm, params.start_y_mm, params.start_heading_rad),
            dist_mm: 0.0,
            left_cps: 0.0,
            right_cps: 0.0,
            params
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// Sample the sensors.
    pub fn frame(&self) -> SensorFrame {
        SensorFrame {
            ticks: self.ticks,
            left_enc_cps: self.left_cps,
            right_enc_cps: self.right_cps,
            centroid_mm: self.centroid_mm(),
            pose: self.pose,
            dist_mm: self.dist_mm,
            bump: self.params.wall_x_mm
                .map(|w| self.pose.position_mm[0] >= w)
                .unwrap_or(false),
            v_bat: Some(self.params.v_bat)
        }
    }

    /// Apply motor efforts for `dt_s` seconds.
    pub fn step(&mut self, dems: &DriveDems, dt_s: f64) {
        let alpha = clamp(dt_s / self.params.motor_tau_s, 0.0, 1.0);
        let gain = self.params.motor_gain_cps * self.params.v_bat / self.params.v_nom;

        // Motors can't be driven past full effort
        let left_eff = clamp(dems.left_effort_pct, -100.0, 100.0);
        let right_eff = clamp(dems.right_effort_pct, -100.0, 100.0);

        self.left_cps += (left_eff * gain - self.left_cps) * alpha;
        self.right_cps += (right_eff * gain - self.right_cps) * alpha;

        let left_mms = self.cps_to_mms(self.left_cps);
        let right_mms = self.cps_to_mms(self.right_cps);

        let speed_mms = 0.5 * (left_mms + right_mms);
        let rate_rads = (right_mms - left_mms) / self.params.wheel_base_mm;

        // Integrate about the mid-step heading
        let mid_heading = self.pose.heading_rad + 0.5 * rate_rads * dt_s;
        self.pose.position_mm[0] += speed_mms * mid_heading.cos() * dt_s;
        self.pose.position_mm[1] += speed_mms * mid_heading.sin() * dt_s;
        self.pose.heading_rad = wrap_pi(self.pose.heading_rad + rate_rads * dt_s);
        self.dist_mm += speed_mms * dt_s;

        self.ticks = time::ticks_add_s(self.ticks, dt_s);
    }

    fn cps_to_mms(&self, cps: f64) -> f64 {
        cps * 2.0 * std::f64::consts::PI * self.params.wheel_radius_mm
            / self.params.counts_per_rev
    }

    /// Offset of the line from the middle of the IR array, positive to the
    /// right, if the array is over the line and roughly facing along it.
    fn centroid_mm(&self) -> Option<f64> {
        let cos_h = self.pose.heading_rad.cos();
        if cos_h.abs() < 0.5 {
            return None
        }

        // Distance along the robot's right axis, (sin h, -cos h), to the line
        let offset_mm = self.pose.position_mm[1] / cos_h;

        if offset_mm.abs() <= self.params.ir_half_width_mm {
            Some(offset_mm)
        }
        else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
