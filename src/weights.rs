//! Extractor weight files in burn's native record format (NamedMpk).
//!
//! The feature stack is only perceptually meaningful with pretrained
//! weights; this module loads them from (and, for tooling, saves them to)
//! an `.mpk` file. A missing `--weights` argument is not an error — the
//! randomly initialized stack still exercises every code path.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use crate::error::{Error, Result};
use crate::extractor::FeatureExtractor;

/// Save extractor weights. burn appends the `.mpk` extension; the full
/// path written is returned.
pub fn save<B: Backend>(extractor: &FeatureExtractor<B>, path: &Path) -> Result<PathBuf> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    extractor
        .clone()
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|e| Error::Weights(format!("save {}: {}", path.display(), e)))?;
    Ok(path.with_extension("mpk"))
}

/// Load extractor weights recorded by [`save`]. The extractor's
/// architecture must match the recorded one.
pub fn load<B: Backend>(
    extractor: FeatureExtractor<B>,
    path: &Path,
    device: &B::Device,
) -> Result<FeatureExtractor<B>> {
    let full_path = if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("mpk")
    };
    if !full_path.exists() {
        return Err(Error::Weights(format!(
            "weight file '{}' not found",
            full_path.display()
        )));
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    extractor
        .load_file(full_path.clone(), &recorder, device)
        .map_err(|e| Error::Weights(format!("load {}: {}", full_path.display(), e)))
}
