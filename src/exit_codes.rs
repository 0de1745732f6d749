//! Exit codes for the `edbo` binary
//!
//! Codes follow the BSD sysexits.h conventions where possible, with a few
//! application-specific codes above 100 for session failures.

/// Exit codes reported by `edbo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed successfully
    Success = exitcode::OK,

    /// Command line usage error
    UsageError = exitcode::USAGE,

    /// The server returned data that could not be understood
    DataError = exitcode::DATAERR,

    /// Unexpected application error
    SoftwareError = exitcode::SOFTWARE,

    /// Configuration file missing, unreadable or incomplete
    ConfigError = exitcode::CONFIG,

    /// Login rejected by the server
    AuthError = 100,

    /// Server unreachable within the retry policy
    NetworkError = 101,

    /// A remote method finished with an unexpected status
    ApiError = 102,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::SoftwareError => "Internal software error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::AuthError => "Authentication error",
            ExitCode::NetworkError => "Network communication error",
            ExitCode::ApiError => "Remote API error",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.code()
    }
}
