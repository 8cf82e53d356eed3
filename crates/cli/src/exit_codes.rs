//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | analyze          | Input schema / empty result              |
//! | 50-59   | smartsheet       | Hosted sheet service                     |
//! | 60-69   | report           | Report output                            |

use scm_recon::ReconError;
use scm_smartsheet::SmartsheetError;

use crate::CliError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file, ambiguous selection
/// in non-interactive mode, invalid config.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Analyze (3-9)
// =============================================================================

/// A findings file or the controls sheet lacks a required column.
pub const EXIT_SCHEMA: u8 = 3;

/// Every selected benchmark was skipped; no report written.
pub const EXIT_NOTHING_TO_REPORT: u8 = 4;

// =============================================================================
// Smartsheet (50-59)
// =============================================================================

/// No access token (neither flag nor env var, and no TTY to prompt on).
pub const EXIT_SOURCE_NOT_AUTH: u8 = 50;

/// Token rejected (401/403).
pub const EXIT_SOURCE_AUTH: u8 = 51;

/// Network failure after retries.
pub const EXIT_SOURCE_NETWORK: u8 = 52;

/// Workspace, sheet or client not found.
pub const EXIT_SOURCE_NOT_FOUND: u8 = 53;

/// Rate limited, 5xx, or unreadable response.
pub const EXIT_SOURCE_UPSTREAM: u8 = 54;

// =============================================================================
// Report (60-69)
// =============================================================================

/// Report file could not be written.
pub const EXIT_REPORT_WRITE: u8 = 60;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a Smartsheet error to its exit code.
pub fn smartsheet_exit_code(err: &SmartsheetError) -> u8 {
    match err {
        SmartsheetError::NotAuthenticated => EXIT_SOURCE_NOT_AUTH,
        SmartsheetError::Http(401 | 403, _) => EXIT_SOURCE_AUTH,
        SmartsheetError::Network(_) => EXIT_SOURCE_NETWORK,
        SmartsheetError::NotFound(_) => EXIT_SOURCE_NOT_FOUND,
        SmartsheetError::Http(..) | SmartsheetError::RateLimited | SmartsheetError::Parse(_) => {
            EXIT_SOURCE_UPSTREAM
        }
    }
}

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema { .. } => EXIT_SCHEMA,
        ReconError::RemoteAccess(_) => EXIT_SOURCE_UPSTREAM,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::Io(_) => EXIT_USAGE,
    }
}

impl From<SmartsheetError> for CliError {
    fn from(err: SmartsheetError) -> Self {
        let hint = match &err {
            SmartsheetError::Http(401 | 403, _) => {
                Some("check the token (Account > Apps & Integrations > API Access)".to_string())
            }
            SmartsheetError::NotFound(_) => {
                Some("is the workspace or sheet shared with this token?".to_string())
            }
            SmartsheetError::RateLimited => Some("wait a minute and retry".to_string()),
            _ => None,
        };
        CliError {
            code: smartsheet_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        CliError {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smartsheet_errors_map_to_source_range() {
        assert_eq!(smartsheet_exit_code(&SmartsheetError::Http(403, "no".into())), 51);
        assert_eq!(smartsheet_exit_code(&SmartsheetError::Http(500, "x".into())), 54);
        assert_eq!(smartsheet_exit_code(&SmartsheetError::RateLimited), 54);
        assert_eq!(smartsheet_exit_code(&SmartsheetError::NotFound("s".into())), 53);
        assert_eq!(smartsheet_exit_code(&SmartsheetError::Network("t".into())), 52);
    }

    #[test]
    fn schema_error_keeps_its_code() {
        let err: CliError = ReconError::schema("poam", "Weakness Name").into();
        assert_eq!(err.code, EXIT_SCHEMA);
        assert!(err.message.contains("Weakness Name"));
    }
}
