//! Run configuration for a single style-transfer invocation.
//!
//! Defaults follow the reference weighting convention: Gram matrices are
//! unnormalized, so the style weight is vastly larger than the content
//! weight by design.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the generated image is initialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitImage {
    /// Start from a copy of the content image (default).
    Content,
    /// Start from a uniform-noise field in the normalized pixel range.
    Noise,
}

/// Configuration for one optimization run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Layers whose raw activations anchor the content loss.
    pub content_layers: Vec<String>,
    /// Layers whose Gram matrices anchor the style loss.
    pub style_layers: Vec<String>,
    /// Weight on the summed content loss.
    pub content_weight: f32,
    /// Weight on the summed style loss.
    pub style_weight: f32,
    /// Total optimizer steps; termination is purely count-based.
    pub steps: usize,
    /// Progress report cadence in steps.
    pub report_every: usize,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Shorter-side resize length and center-crop square size.
    pub image_size: u32,
    /// Generated-image initialization.
    pub init: InitImage,
    /// Seed for noise initialization. Ignored for `InitImage::Content`.
    pub seed: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            content_layers: vec!["conv_4".into()],
            style_layers: vec![
                "conv_1".into(),
                "conv_2".into(),
                "conv_3".into(),
                "conv_4".into(),
                "conv_5".into(),
            ],
            content_weight: 1.0,
            style_weight: 1_000_000.0,
            steps: 500,
            report_every: 50,
            learning_rate: 0.01,
            image_size: 224,
            init: InitImage::Content,
            seed: None,
        }
    }
}

impl TransferConfig {
    /// Validate everything that can be checked without the extractor.
    /// Layer names are validated separately against the extractor topology.
    pub fn validate(&self) -> Result<()> {
        if self.content_layers.is_empty() && self.style_layers.is_empty() {
            return Err(Error::config("no content or style layers configured"));
        }
        if self.report_every == 0 {
            return Err(Error::config("report interval must be at least 1"));
        }
        if !self.content_weight.is_finite() || self.content_weight < 0.0 {
            return Err(Error::config(format!(
                "content weight must be finite and non-negative, got {}",
                self.content_weight
            )));
        }
        if !self.style_weight.is_finite() || self.style_weight < 0.0 {
            return Err(Error::config(format!(
                "style weight must be finite and non-negative, got {}",
                self.style_weight
            )));
        }
        if self.image_size == 0 {
            return Err(Error::config("image size must be at least 1 pixel"));
        }
        Ok(())
    }
}

/// One progress record, emitted at the report cadence.
/// Observational only; it never affects control flow.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// 1-based step index at which the record was taken.
    pub step: usize,
    /// Total steps requested for the run.
    pub total_steps: usize,
    /// Weighted total loss at this step.
    pub total_loss: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        TransferConfig::default().validate().unwrap();
    }

    #[test]
    fn default_layer_sets() {
        let config = TransferConfig::default();
        assert_eq!(config.content_layers, vec!["conv_4"]);
        assert_eq!(config.style_layers.len(), 5);
        assert_eq!(config.style_layers[0], "conv_1");
        assert_eq!(config.style_layers[4], "conv_5");
    }

    #[test]
    fn rejects_zero_report_interval() {
        let config = TransferConfig {
            report_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_weight() {
        let config = TransferConfig {
            style_weight: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TransferConfig {
            content_weight: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_layer_sets() {
        let config = TransferConfig {
            content_layers: vec![],
            style_layers: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
