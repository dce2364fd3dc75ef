//! CLI-specific error types and exit code mapping

use sluice_core::error::SluiceError;
use sluice_interpreter::InterpreterError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// One or more sources failed to compile.
    #[error("{failed} source(s) failed to compile")]
    Compile { failed: usize },

    /// Input message could not be understood.
    #[error("invalid input message: {0}")]
    Input(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from sluice-core.
    #[error("{0}")]
    Core(#[from] SluiceError),

    /// Wrapped domain error from sluice-interpreter.
    #[error("{0}")]
    Interpreter(#[from] InterpreterError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                   |
    /// |------|---------------------------|
    /// | 0    | Success                   |
    /// | 1    | General / command error   |
    /// | 2    | Configuration error       |
    /// | 3    | Compile errors in sources |
    /// | 10   | IO error                  |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Compile { .. } => 3,
            Self::Io(_) => 10,
            Self::Core(e) => core_exit_code(e),
            Self::Interpreter(e) => match e {
                InterpreterError::Compile { .. } => 3,
                InterpreterError::Config { .. } => 2,
                InterpreterError::Io(_) => 10,
                InterpreterError::Store(inner) => core_exit_code(inner),
                _ => 1,
            },
            Self::Command(_) | Self::Input(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

fn core_exit_code(err: &SluiceError) -> u8 {
    match err {
        SluiceError::Config(_) => 2,
        SluiceError::Compile(_) => 3,
        SluiceError::Io(_) => 10,
        SluiceError::Source(_) | SluiceError::Message(_) => 1,
    }
}
