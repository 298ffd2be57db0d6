//! Two-feature logistic regression artifact.
//!
//! Artifact format (JSON):
//!
//! ```json
//! { "coef_lumbar": 0.35, "coef_hip": 0.25, "intercept": -13.5 }
//! ```
//!
//! `p(dangerous) = sigmoid(coef_lumbar * lumbar + coef_hip * hip + intercept)`.
//! The label is `Dangerous` when the decision value is positive (`p > 0.5`);
//! confidence is the probability of the chosen label.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::{ClassifierError, PostureClassifier};
use crate::types::{Classification, PostureLabel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coef_lumbar: f64,
    pub coef_hip: f64,
    pub intercept: f64,
}

impl LogisticModel {
    /// Build from coefficients, rejecting NaN/Inf.
    pub fn new(coef_lumbar: f64, coef_hip: f64, intercept: f64) -> Result<Self, ClassifierError> {
        let model = Self {
            coef_lumbar,
            coef_hip,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load and validate a JSON artifact.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let data = std::fs::read(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&data).map_err(|source| ClassifierError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate()?;

        info!(
            path = %path.display(),
            coef_lumbar = model.coef_lumbar,
            coef_hip = model.coef_hip,
            intercept = model.intercept,
            "Loaded posture model"
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        let fields = [
            ("coef_lumbar", self.coef_lumbar),
            ("coef_hip", self.coef_hip),
            ("intercept", self.intercept),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ClassifierError::Invalid(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Linear decision value; positive means dangerous.
    pub fn decision(&self, lumbar_angle: f64, hip_angle: f64) -> f64 {
        self.coef_lumbar * lumbar_angle + self.coef_hip * hip_angle + self.intercept
    }

    /// Probability of the dangerous class.
    pub fn probability_dangerous(&self, lumbar_angle: f64, hip_angle: f64) -> f64 {
        sigmoid(self.decision(lumbar_angle, hip_angle))
    }
}

impl PostureClassifier for LogisticModel {
    fn classify(&self, lumbar_angle: f64, hip_angle: f64) -> Classification {
        let decision = self.decision(lumbar_angle, hip_angle);
        let p = sigmoid(decision);
        if decision > 0.0 {
            Classification {
                label: PostureLabel::Dangerous,
                confidence: p,
            }
        } else {
            Classification {
                label: PostureLabel::Safe,
                confidence: 1.0 - p,
            }
        }
    }
}

/// Numerically stable logistic function.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn model() -> LogisticModel {
        LogisticModel::new(0.35, 0.25, -13.5).unwrap()
    }

    #[test]
    fn test_sigmoid_symmetry_and_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn test_classifies_reference_points() {
        let m = model();

        let bent = m.classify(35.0, 18.0);
        assert_eq!(bent.label, PostureLabel::Dangerous);
        assert!(bent.confidence > 0.9);

        let upright = m.classify(19.0, 10.0);
        assert_eq!(upright.label, PostureLabel::Safe);
        assert!(upright.confidence > 0.9);
    }

    #[test]
    fn test_confidence_is_probability_of_chosen_label() {
        let m = model();
        for (lumbar, hip) in [(0.0, 0.0), (28.0, 15.0), (40.0, 30.0), (-10.0, 5.0)] {
            let c = m.classify(lumbar, hip);
            let p = m.probability_dangerous(lumbar, hip);
            assert!((0.0..=1.0).contains(&c.confidence));
            assert!(c.confidence >= 0.5);
            match c.label {
                PostureLabel::Dangerous => assert_eq!(c.confidence, p),
                PostureLabel::Safe => assert_eq!(c.confidence, 1.0 - p),
            }
        }
    }

    #[test]
    fn test_zero_decision_is_safe() {
        let m = LogisticModel::new(1.0, 0.0, -20.0).unwrap();
        let c = m.classify(20.0, 0.0);
        assert_eq!(c.label, PostureLabel::Safe);
        assert_eq!(c.confidence, 0.5);
    }

    #[test]
    fn test_rejects_non_finite_coefficients() {
        assert!(matches!(
            LogisticModel::new(f64::NAN, 0.1, 0.0),
            Err(ClassifierError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"coef_lumbar": 0.35, "coef_hip": 0.25, "intercept": -13.5}}"#).unwrap();

        let loaded = LogisticModel::load(file.path()).unwrap();
        assert_eq!(loaded, model());
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let err = LogisticModel::load(Path::new("/nonexistent/posture_model.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/posture_model.json"));
    }

    #[test]
    fn test_load_malformed_artifact_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"coef_lumbar": 0.35}}"#).unwrap();

        assert!(matches!(
            LogisticModel::load(file.path()),
            Err(ClassifierError::Parse { .. })
        ));
    }
}
