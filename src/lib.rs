//! Neural style transfer by direct pixel optimization.
//!
//! Given a content image and a style image, synthesizes an image that
//! keeps the content's spatial structure while adopting the style's
//! texture statistics. Pixels of the generated image are the only
//! trainable values; gradients reach them through a frozen convolutional
//! feature stack.
//!
//! # Public API
//!
//! ```ignore
//! use pastiche::{FeatureExtractorConfig, TransferConfig};
//!
//! let device = Default::default();
//! let extractor = FeatureExtractorConfig::new().init(&device);
//! let mut run = pastiche::begin(extractor, content, style, TransferConfig::default())?;
//! run.run(500, |p| println!("step {}/{}  loss {}", p.step, p.total_steps, p.total_loss))?;
//! let image = run.finish();
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod image_io;
pub mod loss;
pub mod transfer;
pub mod weights;

pub use config::{InitImage, ProgressRecord, TransferConfig};
pub use error::{Error, Result};
pub use extractor::{FeatureExtractor, FeatureExtractorConfig};
pub use transfer::{begin, Canvas, StyleTransfer};
