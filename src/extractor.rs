//! Feature extractor adapter — a frozen VGG-style convolutional stack in burn.
//!
//! The stack is an ordered sequence of named layers (`conv_N`, `relu_N`,
//! `pool_N`). `extract` runs an image through the sequence once and records
//! the intermediate tensor at each requested name. Weights are never
//! updated here: the extractor participates in the autodiff graph so
//! gradients can flow *through* it into the image, but its parameters are
//! marked untracked at construction.

use std::collections::{BTreeMap, BTreeSet};

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::error::Error;

/// Activations keyed by layer name, produced fresh per `extract` call.
pub type ActivationMap<B> = BTreeMap<String, Tensor<B, 4>>;

/// One step of the fixed architectural order.
#[derive(Clone, Debug)]
enum LayerOp {
    /// Index into the conv table.
    Conv(usize),
    Relu,
    Pool,
}

#[derive(Clone, Debug)]
struct LayerSpec {
    name: String,
    op: LayerOp,
}

/// Feature extractor configuration.
#[derive(Config, Debug)]
pub struct FeatureExtractorConfig {
    /// Channel width of the first conv block; each block doubles it,
    /// capped at 8x (64 -> 64, 128, 256, 512, 512).
    #[config(default = 64)]
    pub base_channels: usize,
    /// Number of conv blocks, named `conv_1` .. `conv_N`.
    #[config(default = 5)]
    pub blocks: usize,
    /// Input channel count (RGB).
    #[config(default = 3)]
    pub in_channels: usize,
}

/// Frozen convolutional feature stack with named layers.
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pool: MaxPool2d,
    plan: Ignored<Vec<LayerSpec>>,
}

impl FeatureExtractorConfig {
    /// Initialize the stack. Weights are random; load pretrained ones
    /// through `weights::load` for perceptually meaningful features.
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureExtractor<B> {
        let mut convs = Vec::with_capacity(self.blocks);
        let mut plan = Vec::with_capacity(self.blocks * 3);
        let mut in_channels = self.in_channels;

        for block in 1..=self.blocks {
            let out_channels = self.base_channels << (block - 1).min(3);
            convs.push(
                Conv2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            plan.push(LayerSpec {
                name: format!("conv_{}", block),
                op: LayerOp::Conv(block - 1),
            });
            plan.push(LayerSpec {
                name: format!("relu_{}", block),
                op: LayerOp::Relu,
            });
            plan.push(LayerSpec {
                name: format!("pool_{}", block),
                op: LayerOp::Pool,
            });
            in_channels = out_channels;
        }

        FeatureExtractor {
            convs,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            plan: Ignored(plan),
        }
    }
}

impl<B: Backend> FeatureExtractor<B> {
    /// All layer names in architectural order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.plan.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Channel count the input image must have.
    pub fn in_channels(&self) -> usize {
        self.convs[0].weight.dims()[1]
    }

    /// Reject any requested name absent from the fixed topology.
    pub fn check_layers<'a>(&self, layers: impl IntoIterator<Item = &'a str>) -> crate::error::Result<()> {
        for name in layers {
            if !self.plan.iter().any(|spec| spec.name == name) {
                return Err(Error::config(format!(
                    "unknown layer '{}' (known layers: {})",
                    name,
                    self.layer_names().join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Run `image` through the stack in order, recording the intermediate
    /// tensor at every name in `layers`. The pass stops once all requested
    /// activations are captured.
    pub fn extract(
        &self,
        image: Tensor<B, 4>,
        layers: &BTreeSet<String>,
    ) -> crate::error::Result<ActivationMap<B>> {
        self.check_layers(layers.iter().map(|s| s.as_str()))?;

        let [_, channels, _, _] = image.dims();
        if channels != self.in_channels() {
            return Err(Error::config(format!(
                "image has {} channels, extractor expects {}",
                channels,
                self.in_channels()
            )));
        }

        let mut activations = ActivationMap::new();
        let mut current = image;
        for spec in self.plan.iter() {
            current = match spec.op {
                LayerOp::Conv(index) => self.convs[index].forward(current),
                LayerOp::Relu => relu(current),
                LayerOp::Pool => self.pool.forward(current),
            };
            if layers.contains(&spec.name) {
                activations.insert(spec.name.clone(), current.clone());
            }
            if activations.len() == layers.len() {
                break;
            }
        }
        Ok(activations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn small_extractor(device: &<B as Backend>::Device) -> FeatureExtractor<B> {
        FeatureExtractorConfig::new()
            .with_base_channels(4)
            .with_blocks(2)
            .init(device)
    }

    fn layer_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn layer_names_in_order() {
        let device = Default::default();
        let extractor = small_extractor(&device);
        assert_eq!(
            extractor.layer_names(),
            vec!["conv_1", "relu_1", "pool_1", "conv_2", "relu_2", "pool_2"]
        );
    }

    #[test]
    fn extract_returns_exactly_requested_layers() {
        let device = Default::default();
        let extractor = small_extractor(&device);
        let image = Tensor::<B, 4>::zeros([1, 3, 16, 16], &device);

        let map = extractor
            .extract(image, &layer_set(&["conv_1", "conv_2"]))
            .unwrap();
        assert_eq!(map.len(), 2);
        // conv_1 preserves spatial dims (3x3, pad 1); conv_2 sees the
        // pooled 8x8 tensor and doubles channels.
        assert_eq!(map["conv_1"].dims(), [1, 4, 16, 16]);
        assert_eq!(map["conv_2"].dims(), [1, 8, 8, 8]);
    }

    #[test]
    fn unknown_layer_is_config_error() {
        let device = Default::default();
        let extractor = small_extractor(&device);
        let image = Tensor::<B, 4>::zeros([1, 3, 16, 16], &device);

        let err = extractor
            .extract(image, &layer_set(&["conv_1", "conv_9"]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("conv_9"));
    }

    #[test]
    fn wrong_channel_count_is_config_error() {
        let device = Default::default();
        let extractor = small_extractor(&device);
        let image = Tensor::<B, 4>::zeros([1, 1, 16, 16], &device);

        let err = extractor.extract(image, &layer_set(&["conv_1"])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn channel_widths_double_then_cap() {
        let device = Default::default();
        let extractor = FeatureExtractorConfig::new()
            .with_base_channels(4)
            .with_blocks(5)
            .init::<B>(&device);
        let widths: Vec<usize> = extractor.convs.iter().map(|c| c.weight.dims()[0]).collect();
        assert_eq!(widths, vec![4, 8, 16, 32, 32]);
    }
}
