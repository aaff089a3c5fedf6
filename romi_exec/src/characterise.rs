//! # Motor characterisation
//!
//! Finds the wheel speed controller's `k3` constant from a set of open loop
//! step responses. Each response is the encoder velocity recorded while the
//! motor is held at a constant effort. The steady state velocity of each
//! response is the mean of its tail, a straight line is fitted through the
//! steady state velocities against effort, and `k3` is the inverse of the
//! slope once converted into wheel degrees/second.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of a response, taken from the end, treated as steady state.
pub const DEFAULT_TAIL_FRACTION: f64 = 0.25;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Encoder velocity samples recorded at a constant effort.
#[derive(Debug, Clone)]
pub struct StepResponse {
    /// Units: percent
    pub effort_pct: f64,

    /// Units: counts/second
    pub vel_cps: Vec<f64>
}

/// Straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Characterisation {
    /// Steady state velocity (counts/s) against effort (%).
    pub fit: LinearFit,

    /// Units: effort (%) / (wheel degrees/second)
    pub k3: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CharError {
    #[error("The series contains no samples")]
    EmptySeries,

    #[error("At least two points are needed for a fit, found {0}")]
    TooFewPoints(usize),

    #[error("Series lengths differ ({0} and {1})")]
    LengthMismatch(usize, usize),

    #[error("All efforts are the same, no slope can be found")]
    DegenerateEfforts,

    #[error("The fitted slope is zero or not finite ({0})")]
    ZeroSlope(f64),

    #[error("Tail fraction must be in (0, 1], found {0}")]
    InvalidTailFraction(f64),

    #[error("Encoder constant must be positive, found {0}")]
    InvalidK2(f64)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Mean of the last `tail_fraction` of the samples.
pub fn steady_state_mean(samples: &[f64], tail_fraction: f64) -> Result<f64, CharError> {
    if !(tail_fraction > 0.0 && tail_fraction <= 1.0) {
        return Err(CharError::InvalidTailFraction(tail_fraction));
    }
    if samples.is_empty() {
        return Err(CharError::EmptySeries);
    }

    let n = samples.len();
    let start = (((1.0 - tail_fraction) * n as f64) as usize).min(n - 1);

    maths::mean(&samples[start..]).ok_or(CharError::EmptySeries)
}

/// Least squares straight line fit of `ys` against `xs`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<LinearFit, CharError> {
    if xs.len() != ys.len() {
        return Err(CharError::LengthMismatch(xs.len(), ys.len()));
    }
    if xs.len() < 2 {
        return Err(CharError::TooFewPoints(xs.len()));
    }

    let x_mean = maths::mean(xs).ok_or(CharError::EmptySeries)?;
    let y_mean = maths::mean(ys).ok_or(CharError::EmptySeries)?;

    let mut s_xx = 0.0;
    let mut s_xy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        s_xx += (x - x_mean).powi(2);
        s_xy += (x - x_mean) * (y - y_mean);
    }

    if s_xx == 0.0 {
        return Err(CharError::DegenerateEfforts);
    }

    let slope = s_xy / s_xx;

    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean
    })
}

/// Characterise a motor from its step responses.
///
/// `k2` is the encoder constant in wheel degrees/count.
pub fn characterise(
    responses: &[StepResponse],
    k2: f64
) -> Result<Characterisation, CharError> {
    if !(k2.is_finite() && k2 > 0.0) {
        return Err(CharError::InvalidK2(k2));
    }

    let mut efforts = Vec::with_capacity(responses.len());
    let mut speeds = Vec::with_capacity(responses.len());

    for r in responses {
        let ss = steady_state_mean(&r.vel_cps, DEFAULT_TAIL_FRACTION)?;
        debug!("Steady state at {} %: {:.1} counts/s", r.effort_pct, ss);

        efforts.push(r.effort_pct);
        speeds.push(ss);
    }

    let fit = linear_fit(&efforts, &speeds)?;

    if fit.slope == 0.0 || !fit.slope.is_finite() {
        return Err(CharError::ZeroSlope(fit.slope));
    }

    Ok(Characterisation {
        fit,
        k3: 1.0 / (fit.slope * k2)
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
