//! Sequencer module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::cmd::{CmdMode, Command, NavPlan};
use crate::ctrl::{
    new_heading_ctrl, new_line_centroid_ctrl, Controller, CtrlParams,
    HeadingCtrl, LineCentroidCtrl, WheelSpeedCtrl
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{ang_dist, wrap_pi},
    module::State,
    params,
    session::Session,
    time::{self, Ticks}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Sequencer {
    ctrl_params: CtrlParams,
    params: SeqParams,

    status: SeqStatus,

    /// The plan being (or last) executed.
    plan: Option<NavPlan>,

    /// Index of the executing command within the plan.
    cmd_index: usize,

    /// Reference values captured in the first cycle of the executing command.
    cmd_start: Option<CmdStart>,

    /// Total signed turn since the start of the executing command.
    ///
    /// Units: radians
    turned_rad: f64,

    last_heading_rad: f64,
    last_steer_diff_mms: f64,
    last_ticks: Ticks,

    left_ctrl: WheelSpeedCtrl,
    right_ctrl: WheelSpeedCtrl,
    line_ctrl: LineCentroidCtrl,
    head_ctrl: HeadingCtrl,

    output: DriveDems,
    report: StatusReport,

    arch_status: Archiver
}

#[derive(Debug, Clone, Copy)]
struct CmdStart {
    ticks: Ticks,
    dist_mm: f64,
    heading_rad: f64
}

/// Flat archive record, written once per cycle.
#[derive(Serialize)]
struct ArchRecord {
    ticks: Ticks,
    status: SeqStatus,
    cmd_index: usize,
    mode: Option<CmdMode>,
    end_state: f64,
    left_target_mms: f64,
    right_target_mms: f64,
    steer_diff_mms: f64,
    left_effort_pct: f64,
    right_effort_pct: f64,
    left_acc_error: f64,
    right_acc_error: f64,
    line_acc_error: f64,
    head_acc_error: f64,
    cmd_complete: bool,
    plan_complete: bool,
    cmd_timed_out: bool,
    line_lost: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Execution status of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeqStatus {
    /// No plan has been started.
    Idle,

    /// A plan is executing.
    Running,

    /// The last plan completed all of its commands.
    Complete,

    /// The last plan was stopped before completing.
    Aborted
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Sequencer {
    type InitData = NavPlan;
    type InitError = SeqError;

    type InputData = SensorFrame;
    type OutputData = DriveDems;
    type StatusReport = StatusReport;
    type ProcError = SeqError;

    /// Initialise the sequencer.
    ///
    /// Sets up the archive in the session and begins executing the given
    /// plan.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session
    ) -> Result<(), Self::InitError> {
        self.arch_status = Archiver::from_path(session, "seq/status.csv")?;

        self.begin_plan(init_data)
    }

    /// Process one cycle.
    ///
    /// Outputs zero efforts unless a plan is running.
    fn proc(
        &mut self,
        input_data: &Self::InputData
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {

        // Setup cycle data
        self.output = DriveDems::stop();
        self.report = StatusReport::default();
        self.last_ticks = input_data.ticks;

        if let Some(v_bat) = input_data.v_bat {
            self.set_battery(v_bat);
        }

        match self.status {
            SeqStatus::Running => self.mode_running(input_data)?,
            SeqStatus::Complete => self.report.plan_complete = true,
            SeqStatus::Idle | SeqStatus::Aborted => ()
        }

        self.report.cmd_index = self.cmd_index;

        Ok((self.output, self.report))
    }
}

impl Archived for Sequencer {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let rec = ArchRecord {
            ticks: self.last_ticks,
            status: self.status,
            cmd_index: self.report.cmd_index,
            mode: self.report.mode,
            end_state: self.report.end_state,
            left_target_mms: self.report.left_target_mms,
            right_target_mms: self.report.right_target_mms,
            steer_diff_mms: self.report.steer_diff_mms,
            left_effort_pct: self.output.left_effort_pct,
            right_effort_pct: self.output.right_effort_pct,
            left_acc_error: self.left_ctrl.pi().acc_error(),
            right_acc_error: self.right_ctrl.pi().acc_error(),
            line_acc_error: self.line_ctrl.acc_error(),
            head_acc_error: self.head_ctrl.acc_error(),
            cmd_complete: self.report.cmd_complete,
            plan_complete: self.report.plan_complete,
            cmd_timed_out: self.report.cmd_timed_out,
            line_lost: self.report.line_lost
        };

        self.arch_status.serialise(rec)
    }
}

impl Sequencer {

    /// Create a new idle sequencer.
    pub fn new(ctrl_params: CtrlParams, params: SeqParams) -> Result<Self, SeqError> {
        params.validate().map_err(SeqError::InvalidTimeout)?;

        Ok(Self {
            left_ctrl: WheelSpeedCtrl::new(&ctrl_params.wheel)?,
            right_ctrl: WheelSpeedCtrl::new(&ctrl_params.wheel)?,
            line_ctrl: new_line_centroid_ctrl(&ctrl_params.line)?,
            head_ctrl: new_heading_ctrl(&ctrl_params.heading)?,
            ctrl_params,
            params,
            status: SeqStatus::Idle,
            plan: None,
            cmd_index: 0,
            cmd_start: None,
            turned_rad: 0.0,
            last_heading_rad: 0.0,
            last_steer_diff_mms: 0.0,
            last_ticks: 0,
            output: DriveDems::default(),
            report: StatusReport::default(),
            arch_status: Archiver::default()
        })
    }

    /// Create a new idle sequencer from parameter files, relative to the
    /// parameters directory.
    pub fn from_param_files(ctrl_path: &str, seq_path: &str) -> Result<Self, SeqError> {
        let ctrl_params: CtrlParams = params::load(ctrl_path)?;
        let seq_params: SeqParams = params::load(seq_path)?;

        Self::new(ctrl_params, seq_params)
    }

    /// Begin executing a plan.
    ///
    /// Execution starts from the first command on the next call to `proc`.
    /// Beginning a new plan while one is running is an error, the running
    /// plan must be aborted first.
    pub fn begin_plan(&mut self, plan: NavPlan) -> Result<(), SeqError> {
        if self.status == SeqStatus::Running {
            return Err(SeqError::PlanAlreadyExecuting)
        }

        info!("Beginning plan of {} commands", plan.len());

        self.plan = Some(plan);
        self.cmd_index = 0;
        self.cmd_start = None;
        self.reset_ctrls()?;
        self.status = SeqStatus::Running;

        Ok(())
    }

    /// Abort the executing plan. Efforts are zero from the next call to
    /// `proc`.
    pub fn abort_plan(&mut self) {
        if self.status == SeqStatus::Running {
            warn!("Plan aborted during command {}", self.cmd_index);
            self.status = SeqStatus::Aborted;
            self.cmd_start = None;
        }
    }

    pub fn status(&self) -> SeqStatus {
        self.status
    }

    pub fn cmd_index(&self) -> usize {
        self.cmd_index
    }

    /// The left and right wheel speed controllers.
    pub fn wheel_ctrls(&self) -> (&WheelSpeedCtrl, &WheelSpeedCtrl) {
        (&self.left_ctrl, &self.right_ctrl)
    }

    pub fn line_ctrl(&self) -> &LineCentroidCtrl {
        &self.line_ctrl
    }

    pub fn head_ctrl(&self) -> &HeadingCtrl {
        &self.head_ctrl
    }

    /// Mode running.
    ///
    /// Checks the end condition of the executing command, moving through the
    /// plan as commands complete, then drives according to the command that
    /// is still executing. Several commands can complete in one cycle.
    fn mode_running(&mut self, frame: &SensorFrame) -> Result<(), SeqError> {

        // Track the turn made since the last cycle
        if self.cmd_start.is_some() {
            self.turned_rad += ang_dist(self.last_heading_rad, frame.pose.heading_rad);
            self.last_heading_rad = frame.pose.heading_rad;
        }

        loop {
            let next = self.plan.as_ref().and_then(|p| p.get(self.cmd_index)).cloned();
            let cmd = match next {
                Some(c) => c,
                None => {
                    self.mode_plan_complete();
                    return Ok(())
                }
            };

            let start = match self.cmd_start {
                Some(s) => s,
                None => self.start_cmd(&cmd, frame)
            };

            if let Some(timeout_s) = self.params.cmd_timeout_s {
                let elapsed_s = time::ticks_diff_checked_s(frame.ticks, start.ticks)
                    .unwrap_or(0.0);

                if elapsed_s > timeout_s {
                    warn!(
                        "Command {} ({}) timed out after {:.2} s",
                        self.cmd_index, cmd, elapsed_s
                    );
                    self.report.cmd_timed_out = true;
                    self.abort_plan();
                    return Ok(())
                }
            }

            let end_state = self.end_state(&cmd, frame, &start);
            self.report.mode = Some(cmd.mode());
            self.report.end_state = end_state;

            if !cmd.check_end_condition(end_state) {
                return self.drive(&cmd, frame, &start)
            }

            info!("Command {} complete: {}", self.cmd_index, cmd);
            self.report.cmd_complete = true;
            self.cmd_index += 1;
            self.cmd_start = None;
            self.reset_ctrls()?;
        }
    }

    /// Mode plan complete.
    ///
    /// Entered once every command has completed, stops the motors.
    fn mode_plan_complete(&mut self) {
        info!("Plan complete");

        self.status = SeqStatus::Complete;
        self.report.plan_complete = true;
        self.report.mode = None;
        self.output = DriveDems::stop();
    }

    fn start_cmd(&mut self, cmd: &Command, frame: &SensorFrame) -> CmdStart {
        debug!("Starting command {}: {}", self.cmd_index, cmd);

        let start = CmdStart {
            ticks: frame.ticks,
            dist_mm: frame.dist_mm,
            heading_rad: frame.pose.heading_rad
        };

        self.cmd_start = Some(start);
        self.turned_rad = 0.0;
        self.last_heading_rad = frame.pose.heading_rad;

        start
    }

    /// The value compared against the command's end condition.
    fn end_state(&self, cmd: &Command, frame: &SensorFrame, start: &CmdStart) -> f64 {
        match cmd.mode() {
            CmdMode::LineFollow | CmdMode::Forward | CmdMode::BlindReverse =>
                frame.dist_mm - start.dist_mm,
            CmdMode::PositionFollow => match cmd.target_mm() {
                Some(t) => (t - frame.pose.position_mm).norm(),
                None => std::f64::INFINITY
            },
            CmdMode::Bump => if frame.bump { 1.0 } else { 0.0 },
            CmdMode::TurnInPlace => self.turned_rad
        }
    }

    /// Calculate the wheel speed targets for the command and run the wheel
    /// speed controllers.
    fn drive(
        &mut self,
        cmd: &Command,
        frame: &SensorFrame,
        start: &CmdStart
    ) -> Result<(), SeqError> {
        let ticks = frame.ticks;
        let heading_rad = frame.pose.heading_rad;

        // The heading controller's target is always zero, the measurement is
        // the offset of the current heading from the desired one.
        let (speed_mms, diff_mms) = match cmd.mode() {
            CmdMode::LineFollow => (cmd.lin_speed_mms(), self.line_steer(frame)),
            CmdMode::PositionFollow => {
                let to_target = cmd.target_mm()
                    .ok_or(SeqError::MissingTarget(self.cmd_index))?
                    - frame.pose.position_mm;
                let bearing_rad = to_target[1].atan2(to_target[0]);

                (
                    cmd.lin_speed_mms(),
                    self.head_ctrl.get_action(ticks, wrap_pi(heading_rad - bearing_rad))
                )
            },
            CmdMode::Bump | CmdMode::Forward => (
                cmd.lin_speed_mms(),
                self.head_ctrl.get_action(ticks, wrap_pi(heading_rad - start.heading_rad))
            ),
            CmdMode::BlindReverse => (-cmd.lin_speed_mms().abs(), 0.0),
            CmdMode::TurnInPlace => (
                0.0,
                self.head_ctrl.get_action(ticks, self.turned_rad - cmd.end_condition())
            )
        };

        self.last_steer_diff_mms = diff_mms;

        let left_target_mms = speed_mms - diff_mms;
        let right_target_mms = speed_mms + diff_mms;

        self.left_ctrl.set_target(left_target_mms);
        self.right_ctrl.set_target(right_target_mms);

        self.output = DriveDems {
            left_effort_pct: self.left_ctrl.get_action(ticks, frame.left_enc_cps),
            right_effort_pct: self.right_ctrl.get_action(ticks, frame.right_enc_cps)
        };

        self.report.left_target_mms = left_target_mms;
        self.report.right_target_mms = right_target_mms;
        self.report.steer_diff_mms = diff_mms;

        Ok(())
    }

    /// Steering differential while following the line.
    fn line_steer(&mut self, frame: &SensorFrame) -> f64 {
        match frame.centroid_mm {
            Some(centroid_mm) => self.line_ctrl.get_action(frame.ticks, centroid_mm),
            None => {
                self.report.line_lost = true;

                // Don't integrate across the gap once the line is found again
                self.line_ctrl.rearm();

                match self.params.line_lost {
                    LineLostAction::Straight => 0.0,
                    LineLostAction::HoldLast => self.last_steer_diff_mms
                }
            }
        }
    }

    /// Prepare the controllers for a new command.
    ///
    /// The steering controllers are rebuilt from their parameters so no
    /// accumulated error carries over between commands. The wheel controllers
    /// keep their accumulated error but are rearmed and given a zero target.
    fn reset_ctrls(&mut self) -> Result<(), SeqError> {
        self.left_ctrl.rearm();
        self.right_ctrl.rearm();
        self.left_ctrl.set_target(0.0);
        self.right_ctrl.set_target(0.0);

        self.line_ctrl = new_line_centroid_ctrl(&self.ctrl_params.line)?;
        self.head_ctrl = new_heading_ctrl(&self.ctrl_params.heading)?;
        self.last_steer_diff_mms = 0.0;

        Ok(())
    }

    fn set_battery(&mut self, v_bat: f64) {
        for ctrl in [&mut self.left_ctrl, &mut self.right_ctrl].iter_mut() {
            if let Err(e) = ctrl.set_battery(v_bat) {
                warn!("Ignoring battery reading: {}", e);
                return
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl::{HeadingParams, WheelSpeedParams};
    use crate::sim::{Sim, SimParams};
    use nalgebra::Vector2;
    use std::f64::consts::PI;

    fn frame(ticks: Ticks, dist_mm: f64) -> SensorFrame {
        SensorFrame {
            ticks,
            left_enc_cps: 0.0,
            right_enc_cps: 0.0,
            centroid_mm: Some(0.0),
            pose: Pose::new(dist_mm, 0.0, 0.0),
            dist_mm,
            bump: false,
            v_bat: None
        }
    }

    fn cmd(mode: CmdMode, end_condition: f64) -> Command {
        Command::new(mode, end_condition, 100.0, Some(Vector2::new(1000.0, 0.0))).unwrap()
    }

    fn running(cmds: Vec<Command>, params: SeqParams) -> Sequencer {
        let mut seq = Sequencer::new(CtrlParams::default(), params).unwrap();
        seq.begin_plan(NavPlan::new(cmds).unwrap()).unwrap();
        seq
    }

    #[test]
    fn test_idle_outputs_zero() {
        let mut seq = Sequencer::new(CtrlParams::default(), SeqParams::default()).unwrap();

        let (dems, report) = seq.proc(&frame(0, 0.0)).unwrap();
        assert_eq!(dems, DriveDems::stop());
        assert!(!report.plan_complete);
        assert_eq!(seq.status(), SeqStatus::Idle);
    }

    #[test]
    fn test_commands_advance() {
        let mut seq = running(
            vec![cmd(CmdMode::Forward, 100.0), cmd(CmdMode::Forward, 50.0)],
            SeqParams::default()
        );

        let (_, report) = seq.proc(&frame(0, 0.0)).unwrap();
        assert_eq!(report.cmd_index, 0);
        assert_eq!(report.end_state, 0.0);
        assert!(!report.cmd_complete);

        // First command completes, the second starts from here
        let (dems, report) = seq.proc(&frame(10_000, 100.0)).unwrap();
        assert!(report.cmd_complete);
        assert_eq!(report.cmd_index, 1);
        assert_eq!(report.end_state, 0.0);
        assert!(dems.left_effort_pct > 0.0 && dems.right_effort_pct > 0.0);

        let (dems, report) = seq.proc(&frame(20_000, 160.0)).unwrap();
        assert!(report.cmd_complete);
        assert!(report.plan_complete);
        assert_eq!(dems, DriveDems::stop());
        assert_eq!(seq.status(), SeqStatus::Complete);

        // Stays stopped
        let (dems, report) = seq.proc(&frame(30_000, 170.0)).unwrap();
        assert!(report.plan_complete);
        assert!(!report.cmd_complete);
        assert_eq!(dems, DriveDems::stop());
    }

    #[test]
    fn test_multiple_commands_complete_in_one_cycle() {
        let mut seq = running(
            vec![
                cmd(CmdMode::Forward, 10.0),
                cmd(CmdMode::Forward, 0.0),
                cmd(CmdMode::Forward, 10.0)
            ],
            SeqParams::default()
        );

        seq.proc(&frame(0, 0.0)).unwrap();

        // The zero length command is complete as soon as it starts
        let (_, report) = seq.proc(&frame(10_000, 20.0)).unwrap();
        assert_eq!(report.cmd_index, 2);
        assert_eq!(seq.cmd_index(), 2);
    }

    #[test]
    fn test_begin_while_running() {
        let mut seq = running(vec![cmd(CmdMode::Forward, 100.0)], SeqParams::default());

        let r = seq.begin_plan(NavPlan::new(vec![cmd(CmdMode::Forward, 10.0)]).unwrap());
        assert!(matches!(r, Err(SeqError::PlanAlreadyExecuting)));

        // Allowed once aborted
        seq.abort_plan();
        assert_eq!(seq.status(), SeqStatus::Aborted);
        assert!(seq.begin_plan(NavPlan::new(vec![cmd(CmdMode::Forward, 10.0)]).unwrap()).is_ok());
    }

    #[test]
    fn test_timeout_aborts() {
        let mut seq = running(
            vec![cmd(CmdMode::Forward, 100.0)],
            SeqParams {
                cmd_timeout_s: Some(1.0),
                ..Default::default()
            }
        );

        let (_, report) = seq.proc(&frame(0, 0.0)).unwrap();
        assert!(!report.cmd_timed_out);
        let (_, report) = seq.proc(&frame(500_000, 10.0)).unwrap();
        assert!(!report.cmd_timed_out);

        let (dems, report) = seq.proc(&frame(1_200_000, 20.0)).unwrap();
        assert!(report.cmd_timed_out);
        assert!(!report.plan_complete);
        assert_eq!(dems, DriveDems::stop());
        assert_eq!(seq.status(), SeqStatus::Aborted);

        let (dems, _) = seq.proc(&frame(1_210_000, 20.0)).unwrap();
        assert_eq!(dems, DriveDems::stop());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        for t in &[std::f64::NAN, -1.0, 0.0] {
            let r = Sequencer::new(
                CtrlParams::default(),
                SeqParams {
                    cmd_timeout_s: Some(*t),
                    ..Default::default()
                }
            );
            assert!(matches!(r, Err(SeqError::InvalidTimeout(_))));
        }
    }

    #[test]
    fn test_wheel_effort_held_across_commands() {
        let mut seq = running(
            vec![cmd(CmdMode::Forward, 100.0), cmd(CmdMode::Forward, 100.0)],
            SeqParams::default()
        );

        let mut last = DriveDems::default();
        for i in 0..5 {
            let (dems, report) = seq.proc(&frame(i * 10_000, 10.0 * i as f64)).unwrap();
            assert_eq!(report.cmd_index, 0);
            last = dems;
        }
        assert!(seq.wheel_ctrls().0.pi().acc_error() > 0.0);

        // The next command starts with the same wheel targets, so the effort
        // carries straight over
        let (dems, report) = seq.proc(&frame(50_000, 100.0)).unwrap();
        assert_eq!(report.cmd_index, 1);
        assert!((dems.left_effort_pct - last.left_effort_pct).abs() < 1E-9);
        assert!((dems.right_effort_pct - last.right_effort_pct).abs() < 1E-9);
    }

    #[test]
    fn test_line_steering() {
        let mut seq = running(vec![cmd(CmdMode::LineFollow, 1000.0)], SeqParams::default());

        // Line to the right of the robot, so turn clockwise
        let mut f = frame(0, 0.0);
        f.centroid_mm = Some(10.0);
        let (_, report) = seq.proc(&f).unwrap();
        assert_eq!(report.steer_diff_mms, -4.0);
        assert_eq!(report.left_target_mms, 104.0);
        assert_eq!(report.right_target_mms, 96.0);

        // Line lost, drive straight
        let mut f = frame(10_000, 1.0);
        f.centroid_mm = None;
        let (_, report) = seq.proc(&f).unwrap();
        assert!(report.line_lost);
        assert_eq!(report.left_target_mms, report.right_target_mms);
        assert!(seq.line_ctrl().is_armed());
    }

    #[test]
    fn test_line_lost_hold_last() {
        let mut seq = running(
            vec![cmd(CmdMode::LineFollow, 1000.0)],
            SeqParams {
                line_lost: LineLostAction::HoldLast,
                ..Default::default()
            }
        );

        let mut f = frame(0, 0.0);
        f.centroid_mm = Some(-10.0);
        seq.proc(&f).unwrap();

        f = frame(10_000, 1.0);
        f.centroid_mm = None;
        let (_, report) = seq.proc(&f).unwrap();
        assert!(report.line_lost);
        assert_eq!(report.steer_diff_mms, 4.0);
    }

    #[test]
    fn test_blind_reverse() {
        let mut seq = running(vec![cmd(CmdMode::BlindReverse, -100.0)], SeqParams::default());

        let (dems, report) = seq.proc(&frame(0, 0.0)).unwrap();
        assert_eq!(report.left_target_mms, -100.0);
        assert_eq!(report.right_target_mms, -100.0);
        assert!(dems.left_effort_pct < 0.0);

        let (_, report) = seq.proc(&frame(10_000, -100.0)).unwrap();
        assert!(report.plan_complete);
    }

    #[test]
    fn test_bump() {
        let mut seq = running(vec![cmd(CmdMode::Bump, 1.0)], SeqParams::default());

        let (_, report) = seq.proc(&frame(0, 0.0)).unwrap();
        assert!(!report.cmd_complete);

        let mut f = frame(10_000, 5.0);
        f.bump = true;
        let (_, report) = seq.proc(&f).unwrap();
        assert!(report.plan_complete);
    }

    #[test]
    fn test_turn_accumulates_across_wrap() {
        let mut seq = running(vec![cmd(CmdMode::TurnInPlace, PI)], SeqParams::default());

        let mut f = frame(0, 0.0);
        f.pose.heading_rad = 3.0;
        let (_, report) = seq.proc(&f).unwrap();
        assert_eq!(report.end_state, 0.0);

        // Turning counter-clockwise through pi
        f.ticks = 10_000;
        f.pose.heading_rad = -3.0;
        let (_, report) = seq.proc(&f).unwrap();
        assert!((report.end_state - (2.0 * PI - 6.0)).abs() < 1E-9);
        assert!(report.right_target_mms > report.left_target_mms);

        f.ticks = 20_000;
        f.pose.heading_rad = -0.1;
        let (_, report) = seq.proc(&f).unwrap();
        assert!(report.plan_complete);
    }

    #[test]
    fn test_position_follow_end_state() {
        let mut seq = running(
            vec![Command::new(CmdMode::PositionFollow, 20.0, 100.0, Some(Vector2::new(300.0, 400.0))).unwrap()],
            SeqParams::default()
        );

        let mut f = frame(0, 0.0);
        f.pose = Pose::new(0.0, 0.0, 0.0);
        let (_, report) = seq.proc(&f).unwrap();
        assert!((report.end_state - 500.0).abs() < 1E-9);

        // Target is to the left, so turn counter-clockwise
        assert!(report.right_target_mms > report.left_target_mms);
    }

    #[test]
    fn test_battery_forwarded() {
        let mut seq = running(vec![cmd(CmdMode::Forward, 100.0)], SeqParams::default());

        let mut f = frame(0, 0.0);
        f.v_bat = Some(6.0);
        seq.proc(&f).unwrap();
        assert_eq!(seq.wheel_ctrls().0.battery_voltage(), 6.0);
        assert_eq!(seq.wheel_ctrls().1.battery_voltage(), 6.0);

        // Invalid readings are ignored
        f.ticks = 10_000;
        f.v_bat = Some(-1.0);
        assert!(seq.proc(&f).is_ok());
        assert_eq!(seq.wheel_ctrls().0.battery_voltage(), 6.0);
    }

    #[test]
    fn test_steering_reset_between_commands() {
        let mut seq = running(
            vec![cmd(CmdMode::Forward, 100.0), cmd(CmdMode::Forward, 100.0)],
            SeqParams::default()
        );

        let mut f = frame(0, 0.0);
        f.pose.heading_rad = 0.1;
        seq.proc(&f).unwrap();
        f.ticks = 10_000;
        f.pose.heading_rad = 0.2;
        f.dist_mm = 50.0;
        seq.proc(&f).unwrap();
        assert!(seq.head_ctrl().acc_error() != 0.0);

        f.ticks = 20_000;
        f.dist_mm = 100.0;
        let (_, report) = seq.proc(&f).unwrap();
        assert!(report.cmd_complete);
        assert_eq!(seq.head_ctrl().acc_error(), 0.0);
    }

    /// Run a full plan against the simulated robot.
    #[test]
    fn test_plan_in_sim() {
        let ctrl_params = CtrlParams {
            wheel: WheelSpeedParams {
                k_p: 4.0,
                k_i: 20.0,
                ..Default::default()
            },
            heading: HeadingParams {
                k_p: 1.0,
                k_i: 0.5,
                k3: 60.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let plan = NavPlan::new(vec![
            Command::new(CmdMode::Forward, 300.0, 150.0, None).unwrap(),
            Command::new(CmdMode::TurnInPlace, PI / 2.0, 0.0, None).unwrap(),
            Command::new(CmdMode::PositionFollow, 20.0, 100.0, Some(Vector2::new(300.0, 400.0))).unwrap(),
            Command::new(CmdMode::BlindReverse, -100.0, 100.0, None).unwrap()
        ]).unwrap();

        let mut seq = Sequencer::new(ctrl_params, SeqParams {
            cmd_timeout_s: Some(15.0),
            ..Default::default()
        }).unwrap();
        seq.begin_plan(plan).unwrap();

        let mut sim = Sim::new(SimParams::default());
        let mut complete = false;

        for _ in 0..4000 {
            let (dems, report) = seq.proc(&sim.frame()).unwrap();
            assert!(!report.cmd_timed_out);

            if report.plan_complete {
                complete = true;
                break
            }

            sim.step(&dems, 0.01);
        }

        assert!(complete);

        let pose = sim.pose();
        assert!((pose.position_mm[0] - 300.0).abs() < 40.0, "x = {}", pose.position_mm[0]);
        assert!(pose.position_mm[1] > 240.0 && pose.position_mm[1] < 330.0, "y = {}", pose.position_mm[1]);
    }
}
