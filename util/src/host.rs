//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV_VAR: &str = "ROMI_SW_ROOT";

/// Get the software root directory from the `ROMI_SW_ROOT` environment
/// variable.
///
/// Parameter files are found under `<root>/params` and sessions are created
/// under `<root>/sessions`.
pub fn get_romi_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
