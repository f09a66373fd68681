//! Exit code constants and error mapping for the poegen CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CONFIG` | Invalid CLI arguments or configuration |
//! | 3 | `MISSING_INPUT` | Required session input or upload missing/invalid |
//! | 4 | `MISSING_PREREQUISITE` | Stage ordering violated |
//! | 7 | `PROMPT_TOO_LARGE` | Prompt exceeded the token ceiling |
//! | 9 | `IN_PROGRESS` | Another generation holds the session |
//! | 10 | `TIMEOUT` | LLM call timed out |
//! | 65 | `INVALID_OUTPUT` | Model output could not be rendered |
//! | 70 | `GENERATION_FAILED` | LLM provider call failed |

use crate::error::{LlmError, PoeError};

/// Process exit code.
///
/// ```rust
/// use poegen_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(7), ExitCode::PROMPT_TOO_LARGE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CONFIG: ExitCode = ExitCode(2);
    pub const MISSING_INPUT: ExitCode = ExitCode(3);
    pub const MISSING_PREREQUISITE: ExitCode = ExitCode(4);
    pub const PROMPT_TOO_LARGE: ExitCode = ExitCode(7);
    pub const IN_PROGRESS: ExitCode = ExitCode(9);
    pub const TIMEOUT: ExitCode = ExitCode(10);
    pub const INVALID_OUTPUT: ExitCode = ExitCode(65);
    pub const GENERATION_FAILED: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl PoeError {
    /// Map this error to the CLI exit code table.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigurationMissing(_) => ExitCode::CONFIG,
            Self::MissingInput { .. } | Self::InvalidUpload { .. } => ExitCode::MISSING_INPUT,
            Self::MissingPrerequisite { .. } => ExitCode::MISSING_PREREQUISITE,
            Self::PromptTooLarge { .. } => ExitCode::PROMPT_TOO_LARGE,
            Self::GenerationInProgress { .. } => ExitCode::IN_PROGRESS,
            Self::GenerationFailed {
                cause: LlmError::Timeout { .. },
                ..
            } => ExitCode::TIMEOUT,
            Self::GenerationFailed { .. } => ExitCode::GENERATION_FAILED,
            Self::InvalidDiagramMarkup { .. } | Self::InvalidMappingOutput { .. } => {
                ExitCode::INVALID_OUTPUT
            }
            Self::Render { .. } | Self::SessionNotFound { .. } | Self::Io(_) => {
                ExitCode::INTERNAL
            }
        }
    }
}
