//! Input filters applied to the raw controller error

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::CtrlError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A policy applied to the raw error of a [`super::PiController`] before it is
/// used, once per call to `get_action`.
pub trait InputFilter {
    /// Filter the raw error, returning the error the controller shall use for
    /// this cycle.
    fn filter(&mut self, raw_error: f64) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Uses the raw error as is. Used where the measurement is already filtered
/// upstream (line centroid, heading).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PassThrough;

/// Rejects errors outside of `(-band, band)`, replacing them with zero for
/// that cycle.
///
/// Wheel encoders occasionally report single sample velocity spikes far
/// beyond anything the drive can physically do, these are treated as corrupt
/// samples. The band is exclusive, an error of exactly `band` is rejected.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SpikeRejection {
    band: f64,

    /// Number of samples rejected since construction.
    num_rejected: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputFilter for PassThrough {
    fn filter(&mut self, raw_error: f64) -> f64 {
        raw_error
    }
}

impl SpikeRejection {
    /// Create a new spike rejection filter with the given half band width.
    ///
    /// The band must be positive, a zero or negative band would reject every
    /// sample.
    pub fn new(band: f64) -> Result<Self, CtrlError> {
        if !(band.is_finite() && band > 0.0) {
            return Err(CtrlError::InvalidSpikeBand(band));
        }

        Ok(Self {
            band,
            num_rejected: 0
        })
    }

    /// Half width of the acceptance band.
    pub fn band(&self) -> f64 {
        self.band
    }

    /// Number of samples which have been rejected.
    pub fn num_rejected(&self) -> u64 {
        self.num_rejected
    }
}

impl InputFilter for SpikeRejection {
    fn filter(&mut self, raw_error: f64) -> f64 {
        // Written as an acceptance test so NaN errors are also rejected
        if raw_error > -self.band && raw_error < self.band {
            raw_error
        }
        else {
            self.num_rejected += 1;
            trace!("Rejected error spike of {} (band {})", raw_error, self.band);
            0.0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spike_band_boundary() {
        let mut f = SpikeRejection::new(5000.0).unwrap();

        assert_eq!(f.filter(4999.0), 4999.0);
        assert_eq!(f.filter(-4999.0), -4999.0);
        assert_eq!(f.filter(5000.0), 0.0);
        assert_eq!(f.filter(-5000.0), 0.0);
        assert_eq!(f.filter(5001.0), 0.0);
        assert_eq!(f.filter(std::f64::NAN), 0.0);
        assert_eq!(f.num_rejected(), 4);
    }

    #[test]
    fn test_spike_band_invalid() {
        assert!(SpikeRejection::new(0.0).is_err());
        assert!(SpikeRejection::new(-10.0).is_err());
        assert!(SpikeRejection::new(std::f64::NAN).is_err());
    }

    #[test]
    fn test_pass_through() {
        let mut f = PassThrough;
        assert_eq!(f.filter(1E9), 1E9);
    }
}
