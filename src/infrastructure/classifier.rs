use crate::infrastructure::model_store::ModelError;
use serde::{Deserialize, Serialize};

/// Linear classifier exported from a fitted logistic regression.
///
/// A binary model may carry a single coefficient row, in which case the
/// positive-class probability is `sigmoid(w·x + b)`. Otherwise there is one
/// row per class and probabilities come from a softmax over the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    pub index: usize,
    pub label: String,
    pub probabilities: Vec<f64>,
}

impl ClassPrediction {
    pub fn probability(&self) -> f64 {
        self.probabilities[self.index]
    }
}

impl LinearClassifier {
    pub fn validate(&self, model: &'static str) -> Result<(), ModelError> {
        let invalid = |reason: String| ModelError::InvalidArtifact { model, reason };

        if self.classes.len() < 2 {
            return Err(invalid(format!(
                "need at least two classes, found {}",
                self.classes.len()
            )));
        }
        let expected_rows = if self.classes.len() == 2 && self.coef.len() == 1 {
            1
        } else {
            self.classes.len()
        };
        if self.coef.len() != expected_rows {
            return Err(invalid(format!(
                "{} classes but {} coefficient rows",
                self.classes.len(),
                self.coef.len()
            )));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(invalid(format!(
                "{} coefficient rows but {} intercepts",
                self.coef.len(),
                self.intercept.len()
            )));
        }
        let width = self.coef[0].len();
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err(invalid("coefficient rows differ in width".to_string()));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn decision_function(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        if x.len() != self.n_features() {
            return Err(ModelError::WidthMismatch {
                model: "classifier",
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect())
    }

    /// Fails when a class score overflows, so a NaN never reaches argmax.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let scores = self.decision_function(x)?;
        if let Some(row) = scores.iter().position(|s| !s.is_finite()) {
            // a single row scores the positive class
            let class = if scores.len() == 1 { 1 } else { row };
            return Err(ModelError::NonFinite {
                model: "classifier",
                input: format!("class {}", self.classes[class]),
            });
        }
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&scores))
    }

    /// Ties resolve to the lowest class index.
    pub fn predict(&self, x: &[f64]) -> Result<ClassPrediction, ModelError> {
        let probabilities = self.predict_proba(x)?;
        let index = argmax(&probabilities);
        Ok(ClassPrediction {
            index,
            label: self.classes[index].clone(),
            probabilities,
        })
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
