//! Controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for all of the robot's controllers, normally loaded from
/// `ctrl.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CtrlParams {
    /// Left and right wheel speed controllers
    #[serde(default)]
    pub wheel: WheelSpeedParams,

    /// Line centroid controller
    #[serde(default)]
    pub line: LineCentroidParams,

    /// Heading controller
    #[serde(default)]
    pub heading: HeadingParams
}

/// Parameters for a wheel speed controller.
#[derive(Debug, Clone, Deserialize)]
pub struct WheelSpeedParams {
    /// Proportional gain.
    ///
    /// Units: effort (%) per wheel degree/second, before `k3`
    #[serde(default = "default_gain")]
    pub k_p: f64,

    /// Integral gain.
    #[serde(default = "default_gain")]
    pub k_i: f64,

    /// Lower output limit.
    ///
    /// Units: effort (%)
    #[serde(default = "default_wheel_min_sat")]
    pub min_sat: f64,

    /// Upper output limit.
    ///
    /// Units: effort (%)
    #[serde(default = "default_wheel_max_sat")]
    pub max_sat: f64,

    /// Wheel speed in mm/s to wheel angular rate.
    ///
    /// Units: (wheel degrees/second) / (mm/second)
    #[serde(default = "default_wheel_k1")]
    pub k1: f64,

    /// Encoder counts to wheel angle.
    ///
    /// Units: wheel degrees / count
    #[serde(default = "default_wheel_k2")]
    pub k2: f64,

    /// Angular rate error to effort. Found from the motor step response
    /// characterisation, see [`crate::characterise`].
    ///
    /// Units: effort (%) / (wheel degrees/second)
    #[serde(default = "default_wheel_k3")]
    pub k3: f64,

    /// Half width of the band outside of which an error is treated as an
    /// encoder glitch.
    ///
    /// Units: wheel degrees/second
    #[serde(default = "default_spike_band")]
    pub spike_band_degs: f64,

    /// Nominal (fully charged) battery voltage.
    ///
    /// Units: volts
    #[serde(default = "default_v_nom")]
    pub v_nom: f64,

    /// How the battery compensation gain is applied.
    #[serde(default)]
    pub battery_comp: BatteryComp,

    /// Start with the integral term enabled.
    #[serde(default = "default_true")]
    pub use_integral: bool
}

/// Parameters for the line centroid controller.
#[derive(Debug, Clone, Deserialize)]
pub struct LineCentroidParams {
    #[serde(default = "default_gain")]
    pub k_p: f64,

    #[serde(default = "default_gain")]
    pub k_i: f64,

    /// Lower output limit.
    ///
    /// Units: mm/s of wheel speed differential
    #[serde(default = "default_line_min_sat")]
    pub min_sat: f64,

    /// Upper output limit.
    ///
    /// Units: mm/s of wheel speed differential
    #[serde(default = "default_line_max_sat")]
    pub max_sat: f64,

    /// Centroid error to wheel speed differential.
    ///
    /// Units: (mm/s) / mm
    #[serde(default = "default_unit")]
    pub k3: f64,

    #[serde(default = "default_true")]
    pub use_integral: bool
}

/// Parameters for the heading controller.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadingParams {
    #[serde(default = "default_gain")]
    pub k_p: f64,

    #[serde(default = "default_gain")]
    pub k_i: f64,

    /// Lower output limit.
    ///
    /// Units: mm/s of wheel speed differential
    #[serde(default = "default_heading_min_sat")]
    pub min_sat: f64,

    /// Upper output limit.
    ///
    /// Units: mm/s of wheel speed differential
    #[serde(default = "default_heading_max_sat")]
    pub max_sat: f64,

    /// Heading error to wheel speed differential.
    ///
    /// Units: (mm/s) / radian
    #[serde(default = "default_unit")]
    pub k3: f64,

    #[serde(default = "default_true")]
    pub use_integral: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Application point of the battery compensation gain
/// (`v_nom / v_measured`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryComp {
    /// The gain is tracked but not applied.
    Disabled,

    /// The effort is multiplied by the gain before saturation.
    ScaleOutput
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BatteryComp {
    fn default() -> Self {
        BatteryComp::Disabled
    }
}

impl Default for WheelSpeedParams {
    fn default() -> Self {
        Self {
            k_p: default_gain(),
            k_i: default_gain(),
            min_sat: default_wheel_min_sat(),
            max_sat: default_wheel_max_sat(),
            k1: default_wheel_k1(),
            k2: default_wheel_k2(),
            k3: default_wheel_k3(),
            spike_band_degs: default_spike_band(),
            v_nom: default_v_nom(),
            battery_comp: BatteryComp::default(),
            use_integral: true
        }
    }
}

impl Default for LineCentroidParams {
    fn default() -> Self {
        Self {
            k_p: default_gain(),
            k_i: default_gain(),
            min_sat: default_line_min_sat(),
            max_sat: default_line_max_sat(),
            k3: default_unit(),
            use_integral: true
        }
    }
}

impl Default for HeadingParams {
    fn default() -> Self {
        Self {
            k_p: default_gain(),
            k_i: default_gain(),
            min_sat: default_heading_min_sat(),
            max_sat: default_heading_max_sat(),
            k3: default_unit(),
            use_integral: true
        }
    }
}

// ---------------------------------------------------------------------------
// DEFAULTS
// ---------------------------------------------------------------------------

fn default_gain() -> f64 { 1.0 }
fn default_unit() -> f64 { 1.0 }
fn default_true() -> bool { true }

fn default_wheel_min_sat() -> f64 { -100.0 }
fn default_wheel_max_sat() -> f64 { 100.0 }
fn default_wheel_k1() -> f64 { 1.637 }
fn default_wheel_k2() -> f64 { 0.25 }
fn default_wheel_k3() -> f64 { 0.06 }
fn default_spike_band() -> f64 { 5000.0 }
fn default_v_nom() -> f64 { 9.0 }

fn default_line_min_sat() -> f64 { -4.0 }
fn default_line_max_sat() -> f64 { 4.0 }

fn default_heading_min_sat() -> f64 { -30.0 }
fn default_heading_max_sat() -> f64 { 30.0 }

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
