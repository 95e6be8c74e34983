//! Optimization driver: owns the generated image and runs the
//! gradient-descent loop against the frozen feature stack.
//!
//! The generated image is a single-`Param` module so burn's Adam can step
//! it exactly like a model: backward, collect `GradientsParams`, apply one
//! step. That step is the only mutation point for the image for the whole
//! run. Termination is purely step-count-based; there is no early stop.

use std::collections::BTreeSet;

use burn::module::{Module, Param};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use image::RgbImage;

use crate::config::{InitImage, ProgressRecord, TransferConfig};
use crate::error::{Error, Result};
use crate::extractor::FeatureExtractor;
use crate::image_io::{self, CHANNEL_MEAN, CHANNEL_STD};
use crate::loss::{ContentLoss, StyleLoss};

/// Default seed for noise initialization when none is configured.
const DEFAULT_NOISE_SEED: u64 = 0x5EED_0F_57_1E;

/// The generated image as an optimizable module. The driver exclusively
/// owns the canvas; nothing else mutates it.
#[derive(Module, Debug)]
pub struct Canvas<B: Backend> {
    pixels: Param<Tensor<B, 4>>,
}

impl<B: Backend> Canvas<B> {
    fn new(init: Tensor<B, 4>) -> Self {
        Self {
            pixels: Param::from_tensor(init),
        }
    }

    /// Current pixel values.
    pub fn pixels(&self) -> Tensor<B, 4> {
        self.pixels.val()
    }
}

/// Initialize a style-transfer run.
///
/// Freezes the extractor, validates the configured layer names against its
/// topology, caches the target representations from the content and style
/// images, initializes the canvas, and binds an Adam optimizer to it. All
/// configuration errors surface from this call, before any iteration runs.
pub fn begin<B: AutodiffBackend>(
    extractor: FeatureExtractor<B>,
    content: Tensor<B, 4>,
    style: Tensor<B, 4>,
    config: TransferConfig,
) -> Result<StyleTransfer<B, impl Optimizer<Canvas<B>, B>>> {
    config.validate()?;
    let extractor = extractor.no_grad();
    extractor.check_layers(
        config
            .content_layers
            .iter()
            .chain(config.style_layers.iter())
            .map(|s| s.as_str()),
    )?;

    if content.dims() != style.dims() {
        return Err(Error::config(format!(
            "content shape {:?} != style shape {:?}",
            content.dims(),
            style.dims()
        )));
    }

    // Target representations: computed once, held fixed for the run. The
    // loss constructors detach them from the autodiff graph.
    let content_set: BTreeSet<String> = config.content_layers.iter().cloned().collect();
    let style_set: BTreeSet<String> = config.style_layers.iter().cloned().collect();

    let content_map = extractor.extract(content.clone(), &content_set)?;
    let content_losses = config
        .content_layers
        .iter()
        .map(|name| (name.clone(), ContentLoss::new(content_map[name].clone())))
        .collect();

    let style_map = extractor.extract(style, &style_set)?;
    let style_losses = config
        .style_layers
        .iter()
        .map(|name| (name.clone(), StyleLoss::new(style_map[name].clone())))
        .collect();

    let init = match config.init {
        InitImage::Content => content.detach(),
        InitImage::Noise => noise_like(&content, config.seed.unwrap_or(DEFAULT_NOISE_SEED)),
    };
    let canvas = Canvas::new(init);
    let optimizer = AdamConfig::new().init();
    let wanted_layers = content_set.union(&style_set).cloned().collect();

    Ok(StyleTransfer {
        extractor,
        config,
        wanted_layers,
        content_losses,
        style_losses,
        canvas,
        optimizer,
        completed_steps: 0,
    })
}

/// Single-use style-transfer run. Build with [`begin`], call
/// [`run`](Self::run) until the configured step count is exhausted, then
/// [`finish`](Self::finish).
pub struct StyleTransfer<B: AutodiffBackend, O> {
    extractor: FeatureExtractor<B>,
    config: TransferConfig,
    wanted_layers: BTreeSet<String>,
    content_losses: Vec<(String, ContentLoss<B>)>,
    style_losses: Vec<(String, StyleLoss<B>)>,
    canvas: Canvas<B>,
    optimizer: O,
    completed_steps: usize,
}

impl<B: AutodiffBackend, O: Optimizer<Canvas<B>, B>> StyleTransfer<B, O> {
    /// Run `steps` optimizer steps. Callable repeatedly: running N then M
    /// steps is equivalent to running N + M, since the canvas, optimizer
    /// state, and step counter all persist on `self`.
    ///
    /// `report` fires every `report_every` steps, counted from the start
    /// of the run. It is observational only and never affects control flow.
    pub fn run<F>(&mut self, steps: usize, mut report: F) -> Result<()>
    where
        F: FnMut(ProgressRecord),
    {
        for _ in 0..steps {
            let activations = self
                .extractor
                .extract(self.canvas.pixels(), &self.wanted_layers)?;

            let device = self.canvas.pixels().device();
            let mut content_sum = Tensor::<B, 1>::zeros([1], &device);
            for (name, loss) in &self.content_losses {
                content_sum = content_sum + loss.evaluate(activations[name].clone());
            }
            let mut style_sum = Tensor::<B, 1>::zeros([1], &device);
            for (name, loss) in &self.style_losses {
                style_sum = style_sum + loss.evaluate(activations[name].clone());
            }

            let total = content_sum.mul_scalar(self.config.content_weight)
                + style_sum.mul_scalar(self.config.style_weight);
            let total_loss = total.clone().into_data().to_vec::<f32>().unwrap()[0];

            // Gradients are fresh per backward call; burn does not
            // accumulate across steps. The optimizer step is the only
            // mutation of the canvas.
            let grads = total.backward();
            let grads = GradientsParams::from_grads(grads, &self.canvas);
            self.canvas =
                self.optimizer
                    .step(self.config.learning_rate, self.canvas.clone(), grads);

            self.completed_steps += 1;
            if self.completed_steps % self.config.report_every == 0 {
                report(ProgressRecord {
                    step: self.completed_steps,
                    total_steps: self.config.steps,
                    total_loss,
                });
            }
        }
        Ok(())
    }

    /// Steps applied so far, across all `run` calls.
    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    /// Current generated-image tensor.
    pub fn pixels(&self) -> Tensor<B, 4> {
        self.canvas.pixels()
    }

    /// Terminate: denormalize the generated image back to display pixels.
    /// Consumes the driver; a run is single-use.
    pub fn finish(self) -> RgbImage {
        image_io::denormalize(self.canvas.pixels().detach())
    }
}

/// Uniform display-range noise shaped like `reference`, normalized per
/// channel the way a real input image would be. Deterministic in the seed.
fn noise_like<B: Backend>(reference: &Tensor<B, 4>, seed: u64) -> Tensor<B, 4> {
    let dims = reference.dims();
    let device = reference.device();

    let mut rng = Xorshift64::new(seed);
    let count = dims.iter().product::<usize>();
    let pixels_per_channel = dims[2] * dims[3];
    let mut data = Vec::with_capacity(count);
    for i in 0..count {
        let channel = (i / pixels_per_channel) % dims[1];
        let value = (rng.next() >> 40) as f32 / (1u64 << 24) as f32;
        data.push((value - CHANNEL_MEAN[channel % 3]) / CHANNEL_STD[channel % 3]);
    }

    Tensor::from_data(TensorData::new(data, dims), &device)
}

/// Minimal xorshift PRNG for reproducible noise initialization.
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed | 1, // ensure non-zero
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}
