//! Representation functions and loss terms.
//!
//! Content representation is the raw activation; style representation is
//! the unnormalized Gram matrix. Both loss terms hold a detached target
//! computed once at construction, so no gradient ever flows back into the
//! content or style source images.

use burn::prelude::*;

/// Gram matrix of an activation: flatten `[1, C, H, W]` to `[C, H*W]` and
/// take the inner product of the channel rows with themselves. Symmetric
/// by construction. Deliberately not normalized by `H*W`; style weights
/// are tuned against the unnormalized magnitude.
pub fn gram<B: Backend>(activation: Tensor<B, 4>) -> Tensor<B, 2> {
    let [batch, channels, height, width] = activation.dims();
    debug_assert_eq!(batch, 1, "gram expects a single-image batch");
    let features: Tensor<B, 2> = activation.reshape([channels, height * width]);
    features.clone().matmul(features.transpose())
}

/// Elementwise mean squared error as a rank-1 scalar tensor.
fn mse<B: Backend, const D: usize>(live: Tensor<B, D>, target: Tensor<B, D>) -> Tensor<B, 1> {
    (live - target).powf_scalar(2.0).mean()
}

/// Distance from a fixed target activation.
#[derive(Clone, Debug)]
pub struct ContentLoss<B: Backend> {
    target: Tensor<B, 4>,
}

impl<B: Backend> ContentLoss<B> {
    /// Capture the target activation, detached from the autodiff graph.
    pub fn new(target_activation: Tensor<B, 4>) -> Self {
        Self {
            target: target_activation.detach(),
        }
    }

    pub fn evaluate(&self, live_activation: Tensor<B, 4>) -> Tensor<B, 1> {
        mse(live_activation, self.target.clone())
    }
}

/// Distance from a fixed target Gram matrix.
#[derive(Clone, Debug)]
pub struct StyleLoss<B: Backend> {
    target: Tensor<B, 2>,
}

impl<B: Backend> StyleLoss<B> {
    /// Capture the target's Gram matrix, detached from the autodiff graph.
    pub fn new(target_activation: Tensor<B, 4>) -> Self {
        Self {
            target: gram(target_activation).detach(),
        }
    }

    pub fn evaluate(&self, live_activation: Tensor<B, 4>) -> Tensor<B, 1> {
        mse(gram(live_activation), self.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn random_activation(dims: [usize; 4]) -> Tensor<B, 4> {
        let device = Default::default();
        Tensor::random(dims, Distribution::Uniform(-1.0, 1.0), &device)
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_data().to_vec::<f32>().unwrap()[0]
    }

    #[test]
    fn gram_is_symmetric() {
        let activation = random_activation([1, 6, 5, 7]);
        let g = gram(activation);
        assert_eq!(g.dims(), [6, 6]);

        let diff = (g.clone() - g.transpose()).abs().max();
        assert!(scalar(diff) < 1e-4, "gram matrix is not symmetric");
    }

    #[test]
    fn gram_is_unnormalized() {
        // A constant activation of value v over C channels gives
        // gram entries v*v*H*W, with no division by H*W.
        let device = Default::default();
        let activation = Tensor::<B, 4>::ones([1, 2, 4, 4], &device).mul_scalar(3.0);
        let g = gram(activation);
        let entries = g.into_data().to_vec::<f32>().unwrap();
        for entry in entries {
            assert!((entry - 9.0 * 16.0).abs() < 1e-3);
        }
    }

    #[test]
    fn content_loss_zero_for_identical_activations() {
        let activation = random_activation([1, 4, 8, 8]);
        let loss = ContentLoss::new(activation.clone());
        assert_eq!(scalar(loss.evaluate(activation)), 0.0);
    }

    #[test]
    fn style_loss_zero_for_identical_activations() {
        let activation = random_activation([1, 4, 8, 8]);
        let loss = StyleLoss::new(activation.clone());
        assert_eq!(scalar(loss.evaluate(activation)), 0.0);
    }

    #[test]
    fn content_loss_positive_for_different_activations() {
        let a = random_activation([1, 4, 8, 8]);
        let b = a.clone().add_scalar(0.5);
        let loss = ContentLoss::new(a);
        let value = scalar(loss.evaluate(b));
        assert!((value - 0.25).abs() < 1e-4, "expected 0.5^2, got {}", value);
    }

    #[test]
    fn targets_are_detached() {
        use burn::backend::Autodiff;
        type Ad = Autodiff<NdArray>;

        let device = Default::default();
        let source = Tensor::<Ad, 4>::ones([1, 2, 3, 3], &device).require_grad();
        let loss = StyleLoss::new(source.clone());

        let live = Tensor::<Ad, 4>::zeros([1, 2, 3, 3], &device).require_grad();
        let grads = loss.evaluate(live).backward();
        // The style source never receives a gradient.
        assert!(source.grad(&grads).is_none());
    }
}
