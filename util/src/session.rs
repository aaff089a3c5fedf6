//! Session management
//!
//! A session is one run of an executable. Each session gets its own
//! directory, `<sessions>/<exec_name>_<timestamp>`, containing:
//!
//! - `<exec_name>.log` - the log file
//! - `arch/` - the per-cycle CSV archives
//! - `params/` - copies of the parameter files the run used, see
//!   [`Session::snapshot_params`]
//!
//! The time the session started (the epoch) is recorded once per process and
//! used to timestamp log lines.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::{host, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in session directory names (chrono strftime).
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Session {
    /// The session directory
    pub session_root: PathBuf,

    /// Directory archives are written into
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable ({}) is not set", host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process ({0})")]
    AlreadyStarted(conquer_once::TryInitError),

    #[error("The session epoch could not be read")]
    CannotGetEpoch,

    #[error("Cannot copy parameter file {0:?} into the session: {1}")]
    CannotSnapshotParams(PathBuf, std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session in `$ROMI_SW_ROOT/<sessions_dir>`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let mut sessions_path = host::get_romi_sw_root()
            .map_err(|_| SessionError::SwRootNotSet)?;
        sessions_path.push(sessions_dir);

        Self::new_in(exec_name, sessions_path)
    }

    /// Start a new session in an explicit directory.
    ///
    /// Only one session may be started per process.
    pub fn new_in(exec_name: &str, sessions_path: PathBuf) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::AlreadyStarted)?;

        let timestamp = SESSION_EPOCH
            .get()
            .ok_or(SessionError::CannotGetEpoch)?
            .format(TIMESTAMP_FORMAT);

        let session_root = sessions_path.join(format!("{}_{}", exec_name, timestamp));
        let arch_root = session_root.join("arch");

        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root
        })
    }

    /// Copy parameter files into the session's `params` directory, so the
    /// tuning a run was made with is kept alongside its archives.
    ///
    /// Each path is copied under its file name only.
    pub fn snapshot_params<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), SessionError> {
        let dest_dir = self.session_root.join("params");
        fs::create_dir_all(&dest_dir).map_err(SessionError::CannotCreateDir)?;

        for path in paths {
            let path = path.as_ref();
            let dest = match path.file_name() {
                Some(name) => dest_dir.join(name),
                None => return Err(SessionError::CannotSnapshotParams(
                    path.to_path_buf(),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name")
                ))
            };

            fs::copy(path, &dest)
                .map_err(|e| SessionError::CannotSnapshotParams(path.to_path_buf(), e))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds elapsed since the start of the session, `NaN` if no session has
/// been started.
pub fn get_elapsed_seconds() -> f64 {
    SESSION_EPOCH
        .get()
        .and_then(|e| time::duration_to_seconds(Utc::now() - *e))
        .unwrap_or(std::f64::NAN)
}

/// The session's epoch, or `None` if no session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
