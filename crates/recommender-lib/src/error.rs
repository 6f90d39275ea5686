//! Errors reported at the recommendation boundary

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecommendError {
    /// The request is missing something the caller must supply
    #[error("{0}")]
    Validation(String),

    /// The model bundle is unavailable or failed while predicting
    #[error("{0}")]
    Model(String),
}

impl RecommendError {
    /// Stable, machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::Validation(_) => "validation",
            RecommendError::Model(_) => "model",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub(crate) fn from_model_error(err: anyhow::Error) -> Self {
        RecommendError::Model(format!("Model inference failed: {err:#}"))
    }
}
