//! Generic PI controller with saturation and integral anti-windup

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Controller, CtrlError, InputFilter};
use util::{maths, time::{self, Ticks}};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Unit conversion constants for a physical channel.
///
/// The error is calculated as `target * k1 - measured * k2`, and the PI
/// signal is converted into actuator units by multiplying by `k3`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Scaling {
    /// Target units to error units
    pub k1: f64,

    /// Measurement units to error units
    pub k2: f64,

    /// Error units to actuator units
    pub k3: f64
}

/// Construction parameters for a [`PiController`].
#[derive(Debug, Clone, Copy)]
pub struct PiConfig {
    /// Initial target
    pub target: f64,

    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Lower output limit
    pub min_sat: f64,

    /// Upper output limit
    pub max_sat: f64,

    /// Unit conversions
    pub scaling: Scaling,

    /// Start with the integral term enabled
    pub use_integral: bool
}

/// A closed loop Proportional-Integral controller.
///
/// The controller is time-aware, each call to [`Controller::get_action`]
/// provides the tick counter reading at which the measurement was taken.
/// The first call after construction (or after [`Controller::rearm`]) has no
/// time step, and so only the proportional term is used.
#[derive(Debug, Clone, Serialize)]
pub struct PiController<F> {
    /// The setpoint, in target units
    target: f64,

    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Lower output limit
    min_sat: f64,

    /// Upper output limit
    max_sat: f64,

    scaling: Scaling,

    /// Additional output multiplier applied before saturation, 1 unless a
    /// compensation hook sets it.
    out_gain: f64,

    /// Error used on the last cycle (after filtering)
    error: f64,

    /// Integral of the error
    acc_error: f64,

    /// Time step of the last cycle in seconds
    dt_s: f64,

    /// Tick reading of the last cycle, `None` before the first cycle
    last_ticks: Option<Ticks>,

    use_integral: bool,

    filter: F
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scaling {
    /// No conversion, target, measurement and output share units.
    pub fn identity() -> Self {
        Self::with_k3(1.0)
    }

    /// Identity `k1` and `k2` with the given output conversion.
    pub fn with_k3(k3: f64) -> Self {
        Self {
            k1: 1.0,
            k2: 1.0,
            k3
        }
    }
}

impl<F: InputFilter> PiController<F> {

    /// Create a new controller, checking the configuration is valid.
    pub fn new(config: PiConfig, filter: F) -> Result<Self, CtrlError> {
        check_finite("target", config.target)?;
        check_finite("k_p", config.k_p)?;
        check_finite("k_i", config.k_i)?;
        check_finite("k1", config.scaling.k1)?;
        check_finite("k2", config.scaling.k2)?;
        check_finite("k3", config.scaling.k3)?;
        check_saturation(config.min_sat, config.max_sat)?;

        Ok(Self {
            target: config.target,
            k_p: config.k_p,
            k_i: config.k_i,
            min_sat: config.min_sat,
            max_sat: config.max_sat,
            scaling: config.scaling,
            out_gain: 1.0,
            error: 0.0,
            acc_error: 0.0,
            dt_s: 0.0,
            last_ticks: None,
            use_integral: config.use_integral,
            filter
        })
    }

    /// Proportional and integral gains.
    pub fn gains(&self) -> (f64, f64) {
        (self.k_p, self.k_i)
    }

    /// Lower and upper output limits.
    pub fn saturation(&self) -> (f64, f64) {
        (self.min_sat, self.max_sat)
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    /// The error used on the last cycle.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// The accumulated (integral) error.
    pub fn acc_error(&self) -> f64 {
        self.acc_error
    }

    /// Time step used on the last cycle, in seconds.
    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    pub fn is_integral_enabled(&self) -> bool {
        self.use_integral
    }

    /// Returns true if the next call to `get_action` is a first call.
    pub fn is_armed(&self) -> bool {
        self.last_ticks.is_none()
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn out_gain(&self) -> f64 {
        self.out_gain
    }

    /// Set the output multiplier applied before saturation.
    pub(crate) fn set_out_gain(&mut self, gain: f64) {
        self.out_gain = gain;
    }

    /// Returns true if `output` is at or beyond either output limit.
    fn is_saturated(&self, output: f64) -> bool {
        output >= self.max_sat || output <= self.min_sat
    }
}

impl<F: InputFilter> Controller for PiController<F> {

    fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn set_gains(&mut self, k_p: f64, k_i: f64) -> Result<(), CtrlError> {
        check_finite("k_p", k_p)?;
        check_finite("k_i", k_i)?;

        self.k_p = k_p;
        self.k_i = k_i;

        Ok(())
    }

    fn set_saturation(&mut self, min_sat: f64, max_sat: f64) -> Result<(), CtrlError> {
        check_saturation(min_sat, max_sat)?;

        self.min_sat = min_sat;
        self.max_sat = max_sat;

        Ok(())
    }

    fn enable_integral(&mut self) {
        self.use_integral = true;
    }

    fn disable_integral(&mut self) {
        self.use_integral = false;
    }

    fn rearm(&mut self) {
        self.last_ticks = None;
        self.dt_s = 0.0;
    }

    fn get_action(&mut self, ticks: Ticks, measured: f64) -> f64 {
        // Error in the channel's error units, with any corrupt samples
        // removed by the filter.
        let raw_error = self.target * self.scaling.k1 - measured * self.scaling.k2;
        self.error = self.filter.filter(raw_error);

        // Get the time step. On the first cycle there is no time step so the
        // integral is not touched, and the same goes for a stale reading,
        // which also keeps the previous tick reading so the next good sample
        // integrates over the full gap.
        match self.last_ticks {
            None => {
                self.dt_s = 0.0;
                self.last_ticks = Some(ticks);
            },
            Some(old) => {
                match time::ticks_diff_checked_s(ticks, old) {
                    Some(dt_s) => {
                        self.dt_s = dt_s;
                        self.last_ticks = Some(ticks);
                    },
                    None => {
                        trace!("Stale tick reading {} (last {}), skipping integration", ticks, old);
                        self.dt_s = 0.0;
                    }
                }

                if self.use_integral {
                    self.acc_error += self.error * self.dt_s;
                }
            }
        }

        // Calculate the PI signal. A rearmed controller still applies the
        // error it has already accumulated.
        let i_term = if self.use_integral {
            self.k_i * self.acc_error
        }
        else {
            0.0
        };
        let raw_sig = self.k_p * self.error + i_term;

        // Convert to actuator units and saturate
        let sig = raw_sig * self.scaling.k3 * self.out_gain;
        let out = maths::clamp(sig, self.min_sat, self.max_sat);

        // Stop integrating if saturated in the same direction as the error,
        // by undoing the last integral step.
        if self.use_integral && self.is_saturated(out) && self.error * out > 0.0 {
            self.acc_error -= self.error * self.dt_s;
        }

        trace!(
            "target: {}, meas: {}, err: {}, acc: {}, raw: {}, sig: {}, out: {}",
            self.target, measured, self.error, self.acc_error, raw_sig, sig, out
        );

        out
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(name: &'static str, value: f64) -> Result<(), CtrlError> {
    if value.is_finite() {
        Ok(())
    }
    else {
        Err(CtrlError::NonFiniteParam(name, value))
    }
}

fn check_saturation(min_sat: f64, max_sat: f64) -> Result<(), CtrlError> {
    if !(min_sat.is_finite() && max_sat.is_finite()) || min_sat > max_sat {
        return Err(CtrlError::InvalidSaturation { min_sat, max_sat });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::PassThrough;

    /// 10 ms control period
    const PERIOD_US: Ticks = 10_000;

    fn config(k_p: f64, k_i: f64, min_sat: f64, max_sat: f64) -> PiConfig {
        PiConfig {
            target: 0.0,
            k_p,
            k_i,
            min_sat,
            max_sat,
            scaling: Scaling::identity(),
            use_integral: true
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1E-9
    }

    #[test]
    fn test_invalid_saturation_rejected() {
        let r = PiController::new(config(1.0, 1.0, 5.0, -5.0), PassThrough);
        assert!(matches!(r, Err(CtrlError::InvalidSaturation { .. })));

        let r = PiController::new(config(1.0, 1.0, std::f64::NAN, 5.0), PassThrough);
        assert!(r.is_err());

        let mut c = PiController::new(config(1.0, 1.0, -5.0, 5.0), PassThrough).unwrap();
        assert!(c.set_saturation(3.0, 2.0).is_err());
        assert_eq!(c.saturation(), (-5.0, 5.0));
        assert!(c.set_saturation(-2.0, 2.0).is_ok());
        assert_eq!(c.saturation(), (-2.0, 2.0));
    }

    #[test]
    fn test_first_call_proportional_only() {
        let mut c = PiController::new(config(2.0, 100.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(3.0);

        // Large tick value on the first call must not be used as a dt
        let out = c.get_action(123_456_789, 1.0);
        assert!(close(out, 4.0));
        assert_eq!(c.dt_s(), 0.0);
        assert_eq!(c.acc_error(), 0.0);
    }

    #[test]
    fn test_integration() {
        let mut c = PiController::new(config(1.0, 10.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(1.0);

        let mut t: Ticks = 1_000;
        c.get_action(t, 0.0);
        t += PERIOD_US;
        let out = c.get_action(t, 0.0);

        // err = 1, acc = 0.01, out = 1 + 10 * 0.01
        assert!(close(c.acc_error(), 0.01));
        assert!(close(out, 1.1));
    }

    #[test]
    fn test_output_within_limits() {
        let mut c = PiController::new(config(5.0, 50.0, -4.0, 4.0), PassThrough).unwrap();

        let mut t: Ticks = 1;
        for meas in &[1E9, -1E9, 3.0, -7.5, 1E-3, 0.0, 1E12] {
            let out = c.get_action(t, *meas);
            assert!(out >= -4.0 && out <= 4.0, "out of limits: {}", out);
            t += PERIOD_US;
        }
    }

    #[test]
    fn test_anti_windup_bounds_integral() {
        let mut c = PiController::new(config(1.0, 1.0, -100.0, 100.0), PassThrough).unwrap();
        c.set_target(1000.0);

        let mut t: Ticks = 5;
        for _ in 0..500 {
            let out = c.get_action(t, 0.0);
            assert_eq!(out, 100.0);
            t += PERIOD_US;
        }

        // Saturated from the first cycle, so the integral never grows
        assert!(c.acc_error().abs() < 1E-9);
    }

    #[test]
    fn test_anti_windup_negative_bound() {
        let mut c = PiController::new(config(1.0, 1.0, -100.0, 100.0), PassThrough).unwrap();
        c.set_target(-1000.0);

        let mut t: Ticks = 5;
        for _ in 0..100 {
            assert_eq!(c.get_action(t, 0.0), -100.0);
            t += PERIOD_US;
        }

        assert!(c.acc_error().abs() < 1E-9);
    }

    #[test]
    fn test_integral_resumes_when_error_reverses() {
        let mut c = PiController::new(config(1.0, 1.0, -100.0, 100.0), PassThrough).unwrap();
        c.set_target(1000.0);

        let mut t: Ticks = 5;
        for _ in 0..10 {
            c.get_action(t, 0.0);
            t += PERIOD_US;
        }

        // Error reverses, the output leaves saturation and integration
        // resumes from zero in the new direction.
        c.set_target(0.0);
        c.get_action(t, 50.0);
        assert!(close(c.acc_error(), -0.5));
    }

    #[test]
    fn test_disabled_integral_keeps_stale_acc() {
        let mut c = PiController::new(config(1.0, 10.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(1.0);

        let mut t: Ticks = 1;
        c.get_action(t, 0.0);
        t += PERIOD_US;
        c.get_action(t, 0.0);
        let acc = c.acc_error();
        assert!(acc > 0.0);

        c.disable_integral();
        t += PERIOD_US;
        let out = c.get_action(t, 0.0);

        // No integral contribution and no change to the stored value
        assert!(close(out, 1.0));
        assert_eq!(c.acc_error(), acc);

        c.enable_integral();
        t += PERIOD_US;
        c.get_action(t, 0.0);
        assert!(close(c.acc_error(), acc + 0.01));
    }

    #[test]
    fn test_set_target_does_not_touch_integral() {
        let mut c = PiController::new(config(1.0, 1.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(2.0);
        c.get_action(1, 0.0);
        c.get_action(1 + PERIOD_US, 0.0);
        let acc = c.acc_error();

        c.set_target(-7.0);
        assert_eq!(c.acc_error(), acc);
        assert_eq!(c.target(), -7.0);
    }

    #[test]
    fn test_tick_wraparound() {
        let mut c = PiController::new(config(0.0, 1.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(1.0);

        let t0 = Ticks::MAX - 4_999;
        c.get_action(t0, 0.0);
        c.get_action(t0.wrapping_add(PERIOD_US), 0.0);

        assert!(close(c.dt_s(), 0.01));
        assert!(close(c.acc_error(), 0.01));
    }

    #[test]
    fn test_stale_tick_skips_integration() {
        let mut c = PiController::new(config(0.0, 1.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(1.0);

        c.get_action(50_000, 0.0);
        c.get_action(40_000, 0.0);
        assert_eq!(c.dt_s(), 0.0);
        assert_eq!(c.acc_error(), 0.0);

        // Next good sample integrates from the last good reading
        c.get_action(60_000, 0.0);
        assert!(close(c.dt_s(), 0.01));
    }

    #[test]
    fn test_rearm() {
        let mut c = PiController::new(config(1.0, 1.0, -1E6, 1E6), PassThrough).unwrap();
        c.set_target(1.0);
        c.get_action(1_000, 0.0);
        c.get_action(2_000, 0.0);
        let acc = c.acc_error();
        assert!(!c.is_armed());

        c.rearm();
        assert!(c.is_armed());

        // A long gap across the re-arm is not integrated, but the held
        // integral still contributes
        let out = c.get_action(9_000_000, 0.0);
        assert_eq!(c.acc_error(), acc);
        assert!(close(out, 1.0 + acc));
    }

    #[test]
    fn test_rearm_keeps_effort() {
        let mut c = PiController::new(config(1.0, 1.0, -100.0, 100.0), PassThrough).unwrap();
        c.set_target(10.0);

        let mut t: Ticks = 1;
        let mut out_before = 0.0;
        for _ in 0..200 {
            out_before = c.get_action(t, 0.0);
            t += PERIOD_US;
        }
        assert!(c.acc_error() > 19.0);

        c.rearm();
        let out_after = c.get_action(t, 0.0);

        // Same output as the last cycle before the re-arm, nothing new
        // integrated
        assert!(close(out_after, out_before));
    }

    #[test]
    fn test_set_gains() {
        let mut c = PiController::new(config(1.0, 1.0, -100.0, 100.0), PassThrough).unwrap();

        assert!(matches!(
            c.set_gains(std::f64::NAN, 0.0),
            Err(CtrlError::NonFiniteParam("k_p", _))
        ));
        assert!(matches!(
            c.set_gains(1.0, std::f64::INFINITY),
            Err(CtrlError::NonFiniteParam("k_i", _))
        ));
        assert_eq!(c.gains(), (1.0, 1.0));

        c.set_target(1.0);
        let out = c.get_action(1, 0.0);
        assert!(out >= -100.0 && out <= 100.0);

        assert!(c.set_gains(3.0, 0.5).is_ok());
        assert_eq!(c.gains(), (3.0, 0.5));
    }

    #[test]
    fn test_scaling_and_out_gain() {
        let mut cfg = config(1.0, 0.0, -1E6, 1E6);
        cfg.scaling = Scaling { k1: 2.0, k2: 0.5, k3: 0.1 };
        let mut c = PiController::new(cfg, PassThrough).unwrap();
        c.set_target(10.0);

        // err = 10 * 2 - 4 * 0.5 = 18, out = 18 * 0.1
        assert!(close(c.get_action(1, 4.0), 1.8));

        c.set_out_gain(2.0);
        c.rearm();
        assert!(close(c.get_action(2, 4.0), 3.6));
    }
}
