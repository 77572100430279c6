//! Error types for ensayo
//!
//! Each pipeline component fails fast with its own error kind; the only
//! silent recovery anywhere is the mixed→full precision fallback in the
//! neural-network adapter.

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage names, attached to errors by the experiment runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading and extracting raw input
    Load,
    /// Converting Samples into feature tensors
    Transform,
    /// Fitting the selected model variant
    Fit,
    /// Producing predictions from the trained model
    Predict,
    /// Computing the metrics report
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Transform => "transform",
            Self::Fit => "fit",
            Self::Predict => "predict",
            Self::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Ensayo error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input path missing, archive corrupt, or archive empty
    #[error("Load error: {0}")]
    Load(String),

    /// Sample payload malformed for the selected transform
    #[error("Transform error: {0}")]
    Transform(String),

    /// Features/labels disagree with the selected model variant's contract
    #[error("Fit error: {0}")]
    Fit(String),

    /// Mixed-precision initialization failed and no full-precision
    /// degradation path was available
    #[error("Precision error: {0}\nMixed precision is unavailable on this hardware; rerun with --precision full")]
    Precision(String),

    /// Unrecognized or inconsistent configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// Component failure with the originating pipeline stage attached
    #[error("stage {stage} failed: {source}")]
    Stage {
        /// Pipeline stage that produced the error
        stage: Stage,
        /// The originating component error
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Tensor backend error (candle)
    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl Error {
    /// Attach a pipeline stage to this error.
    ///
    /// An error that already carries a stage keeps the innermost one, so the
    /// stage always names the component that actually failed.
    #[must_use]
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The originating stage, if this error has been attributed to one.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Extension for attributing component results to a pipeline stage.
pub(crate) trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageExt<T> for Result<T> {
    fn at_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.at_stage(stage))
    }
}
