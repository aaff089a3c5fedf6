//! Wheel speed controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::{
    BatteryComp, Controller, CtrlError, PiConfig, PiController, Scaling,
    SpikeRejection, WheelSpeedParams
};
use util::time::Ticks;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts a wheel speed target (mm/s) and an encoder velocity (counts/s)
/// into a motor effort percentage.
///
/// The error is calculated in wheel degrees/second. Errors outside of the
/// spike band are treated as encoder glitches and replaced by zero for that
/// cycle.
#[derive(Debug, Clone, Serialize)]
pub struct WheelSpeedCtrl {
    pi: PiController<SpikeRejection>,

    /// Nominal battery voltage
    v_nom: f64,

    /// Last measured battery voltage
    v_bat: f64,

    /// `v_nom / v_bat`
    bat_gain: f64,

    bat_comp: BatteryComp
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelSpeedCtrl {

    /// Create a new wheel speed controller with a zero speed target.
    pub fn new(params: &WheelSpeedParams) -> Result<Self, CtrlError> {
        if !(params.v_nom.is_finite() && params.v_nom > 0.0) {
            return Err(CtrlError::InvalidBatteryVoltage(params.v_nom));
        }

        let pi = PiController::new(
            PiConfig {
                target: 0.0,
                k_p: params.k_p,
                k_i: params.k_i,
                min_sat: params.min_sat,
                max_sat: params.max_sat,
                scaling: Scaling {
                    k1: params.k1,
                    k2: params.k2,
                    k3: params.k3
                },
                use_integral: params.use_integral
            },
            SpikeRejection::new(params.spike_band_degs)?
        )?;

        Ok(Self {
            pi,
            v_nom: params.v_nom,
            v_bat: params.v_nom,
            bat_gain: 1.0,
            bat_comp: params.battery_comp
        })
    }

    /// Set the measured battery voltage, recalculating the compensation gain.
    pub fn set_battery(&mut self, v_bat: f64) -> Result<(), CtrlError> {
        if !(v_bat.is_finite() && v_bat > 0.0) {
            return Err(CtrlError::InvalidBatteryVoltage(v_bat));
        }

        self.v_bat = v_bat;
        self.bat_gain = self.v_nom / self.v_bat;
        self.apply_bat_comp();

        Ok(())
    }

    /// Change how the battery compensation gain is applied.
    pub fn set_battery_comp(&mut self, bat_comp: BatteryComp) {
        debug!("Wheel speed battery compensation set to {:?}", bat_comp);
        self.bat_comp = bat_comp;
        self.apply_bat_comp();
    }

    /// The battery compensation gain, whether or not it is applied.
    pub fn bat_gain(&self) -> f64 {
        self.bat_gain
    }

    pub fn battery_voltage(&self) -> f64 {
        self.v_bat
    }

    /// The underlying PI controller.
    pub fn pi(&self) -> &PiController<SpikeRejection> {
        &self.pi
    }

    /// Number of encoder samples rejected as spikes.
    pub fn num_rejected(&self) -> u64 {
        self.pi.filter().num_rejected()
    }

    fn apply_bat_comp(&mut self) {
        let gain = match self.bat_comp {
            BatteryComp::Disabled => 1.0,
            BatteryComp::ScaleOutput => self.bat_gain
        };
        self.pi.set_out_gain(gain);
    }
}

impl Controller for WheelSpeedCtrl {
    fn set_target(&mut self, target_mms: f64) {
        self.pi.set_target(target_mms)
    }

    fn target(&self) -> f64 {
        self.pi.target()
    }

    fn set_gains(&mut self, k_p: f64, k_i: f64) -> Result<(), CtrlError> {
        self.pi.set_gains(k_p, k_i)
    }

    fn set_saturation(&mut self, min_sat: f64, max_sat: f64) -> Result<(), CtrlError> {
        self.pi.set_saturation(min_sat, max_sat)
    }

    fn enable_integral(&mut self) {
        self.pi.enable_integral()
    }

    fn disable_integral(&mut self) {
        self.pi.disable_integral()
    }

    fn rearm(&mut self) {
        self.pi.rearm()
    }

    /// `measured` is the encoder velocity in counts/second, the output is the
    /// effort in percent.
    fn get_action(&mut self, ticks: Ticks, enc_vel_cps: f64) -> f64 {
        self.pi.get_action(ticks, enc_vel_cps)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
