//! # Navigation commands
//!
//! A navigation plan is an ordered list of [`Command`]s. Each command selects
//! how the robot is driven while it executes (the [`CmdMode`]), the speed to
//! drive at, and an end condition. The sequencer feeds a mode dependent state
//! value into [`Command::check_end_condition`] each cycle and moves on to the
//! next command once it returns true.
//!
//! Plans are normally loaded from a TOML file of the form:
//!
//! ```toml
//! [[cmd]]
//! mode = "line_follow"
//! end_condition = 1200.0
//! lin_speed_mms = 150.0
//!
//! [[cmd]]
//! mode = "position_follow"
//! end_condition = 20.0
//! lin_speed_mms = 100.0
//! target_mm = [1500.0, 300.0]
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single navigation step.
///
/// Commands are immutable once created, and can only be created through
/// [`Command::new`] or by loading a [`NavPlan`], both of which validate them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    mode: CmdMode,

    /// Completion threshold, meaning depends on the mode:
    ///
    /// - `PositionFollow`: distance to the target, mm
    /// - `LineFollow`, `Forward`, `BlindReverse`: signed distance travelled
    ///   since the start of the command, mm
    /// - `Bump`: bump switch state (1 when pressed)
    /// - `TurnInPlace`: signed angle turned since the start of the command,
    ///   radians (positive counter-clockwise)
    end_condition: f64,

    /// Desired linear speed while the command executes.
    ///
    /// Units: mm/s
    lin_speed_mms: f64,

    /// Target position for `PositionFollow`, ignored for other modes.
    ///
    /// Units: mm
    target_mm: Option<Vector2<f64>>
}

/// An ordered sequence of commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavPlan {
    #[serde(rename = "cmd")]
    cmds: Vec<Command>
}

/// A command as written in a plan file, before validation.
#[derive(Debug, Deserialize)]
struct CommandDef {
    mode: CmdMode,
    end_condition: f64,
    lin_speed_mms: f64,
    #[serde(default)]
    target_mm: Option<Vector2<f64>>
}

/// Plan file contents.
#[derive(Debug, Deserialize)]
struct NavPlanDef {
    #[serde(rename = "cmd", default)]
    cmds: Vec<CommandDef>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The way in which the robot is driven during a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CmdMode {
    /// Follow the line under the IR sensor array.
    #[serde(alias = "lin")]
    LineFollow,

    /// Drive towards the command's target position.
    #[serde(alias = "pos")]
    PositionFollow,

    /// Drive straight until the bump switch is pressed.
    #[serde(alias = "bmp")]
    Bump,

    /// Reverse without any steering.
    #[serde(alias = "rev")]
    BlindReverse,

    /// Drive straight, holding the heading at the start of the command.
    #[serde(alias = "fwd")]
    Forward,

    /// Turn about the centre of the wheelbase.
    #[serde(alias = "tip")]
    TurnInPlace
}

/// Errors in building commands and plans.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command value {0} must be finite, found {1}")]
    NonFinite(&'static str, f64),

    #[error("A position follow command must have a target position")]
    MissingTarget,

    #[error("The navigation plan contains no commands")]
    EmptyPlan,

    #[error("Command {index} of the plan is invalid: {source}")]
    InvalidCommand {
        index: usize,
        #[source]
        source: Box<CommandError>
    },

    #[error("Could not load the plan: {0}")]
    LoadError(#[from] params::LoadError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Command {

    /// Create a new command.
    ///
    /// `target_mm` is required for `PositionFollow` and ignored otherwise.
    pub fn new(
        mode: CmdMode,
        end_condition: f64,
        lin_speed_mms: f64,
        target_mm: Option<Vector2<f64>>
    ) -> Result<Self, CommandError> {
        let cmd = Self {
            mode,
            end_condition,
            lin_speed_mms,
            target_mm
        };

        cmd.validate()?;

        Ok(cmd)
    }

    pub fn mode(&self) -> CmdMode {
        self.mode
    }

    pub fn end_condition(&self) -> f64 {
        self.end_condition
    }

    pub fn lin_speed_mms(&self) -> f64 {
        self.lin_speed_mms
    }

    pub fn target_mm(&self) -> Option<Vector2<f64>> {
        self.target_mm
    }

    /// Determine if the command has been completed.
    ///
    /// For `PositionFollow` the state is the remaining distance to the target
    /// and the command is complete once it is within the end condition. For
    /// all other modes the state is the progress made, and the command is
    /// complete once the progress passes the end condition, in the direction
    /// given by the end condition's sign.
    pub fn check_end_condition(&self, state: f64) -> bool {
        match self.mode {
            CmdMode::PositionFollow => state <= self.end_condition,
            _ => {
                if self.end_condition > 0.0 {
                    state >= self.end_condition
                }
                else {
                    state <= self.end_condition
                }
            }
        }
    }

    /// Check that all values in the command are usable.
    pub fn validate(&self) -> Result<(), CommandError> {
        if !self.end_condition.is_finite() {
            return Err(CommandError::NonFinite("end_condition", self.end_condition));
        }
        if !self.lin_speed_mms.is_finite() {
            return Err(CommandError::NonFinite("lin_speed_mms", self.lin_speed_mms));
        }

        match (self.mode, self.target_mm) {
            (CmdMode::PositionFollow, None) => Err(CommandError::MissingTarget),
            (_, Some(t)) if !(t[0].is_finite() && t[1].is_finite()) =>
                Err(CommandError::NonFinite("target_mm", if t[0].is_finite() { t[1] } else { t[0] })),
            _ => Ok(())
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (end: {}, speed: {} mm/s", self.mode, self.end_condition, self.lin_speed_mms)?;
        if let (CmdMode::PositionFollow, Some(t)) = (self.mode, self.target_mm) {
            write!(f, ", target: ({}, {}) mm", t[0], t[1])?;
        }
        write!(f, ")")
    }
}

impl NavPlan {

    /// Build a plan from a list of commands, validating every one of them.
    pub fn new(cmds: Vec<Command>) -> Result<Self, CommandError> {
        let plan = Self { cmds };
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan file relative to the parameters directory.
    pub fn load(param_file_path: &str) -> Result<Self, CommandError> {
        let def: NavPlanDef = params::load(param_file_path)?;
        Self::from_def(def)
    }

    /// Load a plan file from an explicit path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CommandError> {
        let def: NavPlanDef = params::load_from_path(path)?;
        Self::from_def(def)
    }

    /// Parse a plan from TOML text.
    pub fn from_toml(plan_str: &str) -> Result<Self, CommandError> {
        let def: NavPlanDef = params::from_str("<plan>", plan_str)?;
        Self::from_def(def)
    }

    fn from_def(def: NavPlanDef) -> Result<Self, CommandError> {
        let cmds = def.cmds
            .into_iter()
            .enumerate()
            .map(|(index, c)| {
                Command::new(c.mode, c.end_condition, c.lin_speed_mms, c.target_mm)
                    .map_err(|e| CommandError::InvalidCommand {
                        index,
                        source: Box::new(e)
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(cmds)
    }

    pub fn cmds(&self) -> &[Command] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Command> {
        self.cmds.get(index)
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.cmds.is_empty() {
            return Err(CommandError::EmptyPlan);
        }

        for (index, cmd) in self.cmds.iter().enumerate() {
            cmd.validate().map_err(|e| CommandError::InvalidCommand {
                index,
                source: Box::new(e)
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
