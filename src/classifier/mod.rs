//! Posture classification
//!
//! The monitor consumes a trained model as an opaque artifact: anything that
//! maps `(lumbar_angle, hip_angle)` to a label and a confidence. The shipped
//! implementation is a two-feature logistic regression loaded from JSON.

mod logistic;

pub use logistic::LogisticModel;

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Classification;

/// Maps an angle pair to a posture label.
///
/// Called once per poll; implementations must be cheap and must not fail.
pub trait PostureClassifier: Send + Sync + 'static {
    fn classify(&self, lumbar_angle: f64, hip_angle: f64) -> Classification;
}

/// Model artifact errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model artifact I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model artifact parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}
