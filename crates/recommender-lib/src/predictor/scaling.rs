//! Mean/variance scaling fitted at training time

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Standard scaler parameters: `(x - mean) / scale` per feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    /// Scaler that leaves `n` features untouched
    pub fn identity(n: usize) -> Self {
        Self {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Check the parameters against the expected feature count
    pub fn validate(&self, num_features: usize) -> Result<()> {
        if self.mean.len() != num_features || self.scale.len() != num_features {
            bail!(
                "Scaler has {} means and {} scales, expected {} features",
                self.mean.len(),
                self.scale.len(),
                num_features
            );
        }
        Ok(())
    }

    pub fn transform(&self, raw: &[f64]) -> Result<Vec<f64>> {
        self.validate(raw.len())?;

        Ok(raw
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Zero-variance features are fitted with a unit scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}
