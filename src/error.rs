use thiserror::Error;

/// Every failure mode of a generation run. All variants are fatal: the
/// pipeline has no retry or partial-output path, errors propagate straight
/// up to `main`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A prompt template referenced a variable that was not supplied.
    /// Raised before any network call for the affected stage.
    #[error("prompt template variable `{{{variable}}}` was never substituted")]
    Template { variable: String },

    /// The network call to the model service failed (connectivity, auth,
    /// quota, non-2xx status).
    #[error("model invocation failed: {0}")]
    Invocation(String),

    /// A JSON-mode response was not valid JSON, even after unwrapping a
    /// stray markdown fence.
    #[error("model response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// A JSON-mode response parsed fine but had the wrong shape for the
    /// stage that requested it.
    #[error("model response violated the stage contract: {0}")]
    Contract(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
