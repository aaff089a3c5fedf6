//! Sequencer parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the command sequencer, normally loaded from `seq.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SeqParams {
    /// Maximum time a single command may execute for before the plan is
    /// aborted. No limit if not set.
    ///
    /// Units: seconds
    #[serde(default)]
    pub cmd_timeout_s: Option<f64>,

    /// What to steer with while following a line and the line is not seen.
    #[serde(default)]
    pub line_lost: LineLostAction
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Steering used during `LineFollow` while no centroid is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLostAction {
    /// Drive straight (zero differential).
    Straight,

    /// Keep the last differential calculated while the line was visible.
    HoldLast
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SeqParams {
    /// Check the parameters are usable, returning the offending timeout if
    /// not. A timeout must be finite and positive.
    pub fn validate(&self) -> Result<(), f64> {
        match self.cmd_timeout_s {
            Some(t) if !(t.is_finite() && t > 0.0) => Err(t),
            _ => Ok(())
        }
    }
}

impl Default for LineLostAction {
    fn default() -> Self {
        LineLostAction::Straight
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmd::{CmdMode, NavPlan};
    use crate::ctrl::{BatteryComp, CtrlParams};
    use crate::sim::SimParams;
    use util::params::from_str;

    #[test]
    fn test_defaults() {
        let p: SeqParams = from_str("seq.toml", "").unwrap();
        assert_eq!(p.cmd_timeout_s, None);
        assert_eq!(p.line_lost, LineLostAction::Straight);

        let p: SeqParams = from_str("seq.toml", "line_lost = \"hold_last\"").unwrap();
        assert_eq!(p.line_lost, LineLostAction::HoldLast);
    }

    #[test]
    fn test_timeout_validation() {
        assert!(SeqParams::default().validate().is_ok());

        let p: SeqParams = from_str("seq.toml", "cmd_timeout_s = 2.5").unwrap();
        assert!(p.validate().is_ok());

        for t in &[0.0, -1.0, std::f64::INFINITY] {
            let p = SeqParams { cmd_timeout_s: Some(*t), ..Default::default() };
            assert_eq!(p.validate(), Err(*t));
        }

        // Would otherwise never fire
        let p = SeqParams { cmd_timeout_s: Some(std::f64::NAN), ..Default::default() };
        assert!(p.validate().is_err());
    }

    /// The parameter files shipped in the repository must parse.
    #[test]
    fn test_shipped_params() {
        let seq: SeqParams = from_str(
            "seq.toml", include_str!("../../../params/seq.toml")
        ).unwrap();
        assert_eq!(seq.cmd_timeout_s, Some(30.0));

        let ctrl: CtrlParams = from_str(
            "ctrl.toml", include_str!("../../../params/ctrl.toml")
        ).unwrap();
        assert_eq!(ctrl.wheel.battery_comp, BatteryComp::Disabled);
        assert_eq!(ctrl.heading.k3, 60.0);

        let sim: SimParams = from_str(
            "sim.toml", include_str!("../../../params/sim.toml")
        ).unwrap();
        assert_eq!(sim.wall_x_mm, Some(1300.0));
        assert_eq!(sim.start_ticks, SimParams::default().start_ticks);

        let plan = NavPlan::from_toml(include_str!("../../../params/nav_plan.toml")).unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.cmds()[5].mode(), CmdMode::BlindReverse);
    }
}
