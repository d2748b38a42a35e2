use thiserror::Error;

/// Errors raised by the extraction passes and the line classifier.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The line classifier was invoked before a model was trained or loaded.
    #[error("line classifier unavailable: no model has been trained or loaded")]
    ClassifierUnavailable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configured splitter pattern failed to compile.
    #[error("invalid splitter pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid training data at line {line}: {reason}")]
    TrainingData { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
