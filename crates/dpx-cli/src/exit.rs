//! Process exit codes

use dpx_core::SessionError;
use dpx_session::{SessionEnd, SessionReport};

/// Browser closed and everything was stopped
pub const SUCCESS: u8 = 0;
/// Any fatal session error, or a process that could not be stopped
pub const FAILURE: u8 = 1;
/// Invalid invocation (clap uses the same code for its own errors)
pub const USAGE: u8 = 2;
/// Stopped by SIGINT or SIGTERM
pub const INTERRUPTED: u8 = 130;

/// Exit code for a session that ran to an end.
///
/// Teardown failures win over the interrupt code. The browser's own exit
/// status is not reflected.
pub fn for_report(report: &SessionReport) -> u8 {
    if !report.is_clean() {
        return FAILURE;
    }
    match report.end {
        SessionEnd::BrowserClosed(_) => SUCCESS,
        SessionEnd::Interrupted => INTERRUPTED,
    }
}

/// Exit code for a session that failed
pub fn for_error(error: &SessionError) -> u8 {
    if error.is_usage() {
        USAGE
    } else {
        FAILURE
    }
}
