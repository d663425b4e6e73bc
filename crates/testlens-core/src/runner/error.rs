use thiserror::Error;

/// Errors raised while starting or reading from a test runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read runner output: {0}")]
    Io(#[from] std::io::Error),

    #[error("No runner program configured")]
    MissingProgram,

    #[error("Runner output pipe `{0}` was not captured")]
    MissingPipe(&'static str),

    #[error("Transport failed: {0}")]
    Transport(String),
}
