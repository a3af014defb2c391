//! Build metadata.
//!
//! `POD_MONITOR_GIT_COMMIT` and `POD_MONITOR_BUILD_TIME` are read at compile
//! time; unset values render as "unknown".

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_COMMIT: &str = match option_env!("POD_MONITOR_GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

pub const BUILD_TIME: &str = match option_env!("POD_MONITOR_BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION,
        commit: GIT_COMMIT,
        build_time: BUILD_TIME,
    }
}
