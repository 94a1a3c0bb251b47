// # redirect-cli
//
// Thin integration layer behind the `validate-redirects` and `sync-redirects`
// binaries. Reads the environment, installs logging, and hands plain values
// to `redirect-core`. No reconciliation logic lives here.

pub mod logging;
pub mod settings;

use std::process::ExitCode;

/// Exit codes shared by both binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Validation or sync succeeded
    Success = 0,
    /// Any validation, credential or sync failure
    Failure = 1,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status as u8)
    }
}
