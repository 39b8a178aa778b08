//! Error types for the structure engine and translator

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, MddfError>;

/// Engine errors
///
/// Structural violations and unresolved variables are never errors; they are
/// reported through [`crate::diagnostics::Diagnostic`] instead.
#[derive(Error, Debug)]
pub enum MddfError {
    #[error("Invalid rule definition '{usage}': {reason}")]
    Configuration { usage: String, reason: String },

    #[error("Invalid path expression '{expression}' at offset {position}: {reason}")]
    PathSyntax {
        expression: String,
        position: usize,
        reason: String,
    },

    #[error("Unknown namespace placeholder or prefix: {0}")]
    UnknownNamespace(String),

    #[error("No rule definition for usage '{0}'")]
    UnknownUsage(String),

    #[error("Rule '{0}' has no targetPath; context nodes must be supplied")]
    MissingTargetPath(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Translation from {from} to {to} is not supported")]
    UnsupportedTranslation { from: String, to: String },

    #[error("<{element}> has none of the required anchor elements {anchors}")]
    MissingAnchor { element: String, anchors: String },

    #[error("Cannot translate <{element}>: {reason}")]
    Untranslatable { element: String, reason: String },

    #[error("Translation step '{step}' ({from} -> {to}) failed: {source}")]
    StepFailed {
        step: String,
        from: String,
        to: String,
        source: Box<MddfError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl MddfError {
    pub(crate) fn configuration(usage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            usage: usage.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn untranslatable(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Untranslatable {
            element: element.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn path_syntax(
        expression: impl Into<String>,
        position: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::PathSyntax {
            expression: expression.into(),
            position,
            reason: reason.into(),
        }
    }
}
