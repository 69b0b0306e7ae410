//! Exit code constants for the `dealmemo` binary.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run completed and the document was written |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 10 | `PHASE_TIMEOUT` | A phase's backend call exceeded its time bound |
//! | 65 | `MALFORMED_OUTPUT` | A phase answered with output that is not a valid patch |
//! | 70 | `BACKEND_FAILURE` | The backend call failed (network, auth, quota, outage) |
//! | 130 | `CANCELLED` | The run was cancelled |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the numeric
/// value for `std::process::exit()`. Errors map to codes through
/// `DealmemoError::to_exit_code()`.
///
/// # Example
///
/// ```rust
/// use dealmemo_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::MALFORMED_OUTPUT, ExitCode::from_i32(65));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - run completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Phase timeout - a backend call exceeded the phase time bound
    pub const PHASE_TIMEOUT: ExitCode = ExitCode(10);

    /// Malformed output - extraction or parsing produced no structured patch
    pub const MALFORMED_OUTPUT: ExitCode = ExitCode(65);

    /// Backend failure - the provider call itself failed
    pub const BACKEND_FAILURE: ExitCode = ExitCode(70);

    /// Cancelled - interrupted by the caller (SIGINT)
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
