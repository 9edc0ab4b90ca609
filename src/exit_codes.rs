/// Exit codes for djlint-ls command line use
///
/// These let scripts and CI distinguish problems in the templates from
/// failures of the tool itself.
/// Success - No problems found, or nothing to reformat
pub const SUCCESS: i32 = 0;

/// Lint problems found, or files that would be reformatted under `--check`
pub const PROBLEMS_FOUND: i32 = 1;

/// Tool error - Configuration error, file access error, or djLint failure
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{PROBLEMS_FOUND, SUCCESS, TOOL_ERROR};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with problems found code (1)
    pub fn problems_found() -> ! {
        std::process::exit(PROBLEMS_FOUND);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
