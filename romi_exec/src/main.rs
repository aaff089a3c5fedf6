//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the navigation plan
//!     - Main loop:
//!         - Sample the sensors (the simulated robot)
//!         - Sequencer processing
//!         - Apply the motor efforts
//!         - Write archives
//!
//! The loop stops once the plan is complete or has been aborted.
//!
//! # Usage
//!
//! `romi_exec [PLAN_PATH]`
//!
//! With no arguments the plan is loaded from `nav_plan.toml` in the
//! parameters directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, error, info, warn};
use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use romi_lib::{
    cmd::NavPlan,
    seq::{SeqStatus, Sequencer},
    sim::{Sim, SimParams}
};
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    params::{self, LoadError},
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.01;

/// Stop after this many cycles even if the plan hasn't finished.
const MAX_NUM_CYCLES: u64 = 60_000;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "romi_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Romi Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PLAN ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let params_dir = host::get_romi_sw_root()
        .wrap_err("Could not find the software root")?
        .join("params");

    let plan_path = match args.len() {
        1 => params_dir.join("nav_plan.toml"),
        2 => PathBuf::from(&args[1]),
        n => return Err(eyre!(
            "Expected either zero or one argument, found {}", n - 1
        ))
    };

    info!("Loading plan from {:?}", plan_path);
    let plan = NavPlan::load_from_path(&plan_path)
        .wrap_err("Failed to load the plan")?;

    info!("Loaded plan of {} commands:", plan.len());
    for (i, cmd) in plan.cmds().iter().enumerate() {
        info!("    {}: {}", i, cmd);
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut seq = Sequencer::from_param_files("ctrl.toml", "seq.toml")
        .wrap_err("Failed to load the sequencer parameters")?;
    seq.init(plan, &session)
        .wrap_err("Failed to initialise the Sequencer")?;
    info!("Sequencer init complete");

    let sim_params: SimParams = match params::load("sim.toml") {
        Ok(p) => p,
        Err(LoadError::FileLoadError(path, _)) => {
            info!("No simulation parameters at {:?}, using defaults", path);
            SimParams::default()
        },
        Err(e) => return Err(e).wrap_err("Failed to load the simulation parameters")
    };
    let mut sim = Sim::new(sim_params);

    info!("Module initialisation complete\n");

    // Keep a copy of the tuning used for this run with its archives
    let mut snapshot = vec![
        params_dir.join("ctrl.toml"),
        params_dir.join("seq.toml"),
        plan_path
    ];
    if params_dir.join("sim.toml").is_file() {
        snapshot.push(params_dir.join("sim.toml"));
    }
    session.snapshot_params(&snapshot)
        .wrap_err("Failed to copy the parameters into the session")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut num_cycles: u64 = 0;

    loop {
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let frame = sim.frame();

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (dems, report) = match seq.proc(&frame) {
            Ok(r) => r,
            Err(e) => {
                error!("Error during Sequencer processing: {}", e);
                seq.abort_plan();
                break
            }
        };

        sim.step(&dems, CYCLE_PERIOD_S);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = seq.write() {
            warn!("Could not write Sequencer archive: {}", e);
        }

        if report.plan_complete {
            info!("Plan complete after {} cycles", num_cycles);
            break
        }
        if seq.status() == SeqStatus::Aborted {
            warn!("Plan aborted during command {}", report.cmd_index);
            break
        }

        // ---- CYCLE MANAGEMENT ----

        num_cycles += 1;
        if num_cycles >= MAX_NUM_CYCLES {
            warn!("Plan not finished after {} cycles, stopping", num_cycles);
            seq.abort_plan();
            break
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }
    }

    // ---- SHUTDOWN ----

    let pose = sim.pose();
    info!(
        "Final pose: ({:.1}, {:.1}) mm, heading {:.3} rad",
        pose.position_mm[0], pose.position_mm[1], pose.heading_rad
    );
    info!("End of execution");

    Ok(())
}
