#![recursion_limit = "256"]

use clap::Parser;
use std::path::PathBuf;
use std::process;

use burn::backend::{Autodiff, NdArray, Wgpu};
use burn::tensor::backend::AutodiffBackend;

use pastiche::config::{InitImage, ProgressRecord, TransferConfig};
use pastiche::error::Result;
use pastiche::extractor::FeatureExtractorConfig;
use pastiche::{image_io, transfer, weights};

#[derive(Parser)]
#[command(
    name = "pastiche",
    version,
    about = "Neural style transfer — optimize an image's pixels to match one image's structure and another's texture"
)]
struct Cli {
    /// Content image (structure to preserve)
    content: PathBuf,
    /// Style image (texture to adopt)
    style: PathBuf,
    /// Output image path
    #[arg(short, long, default_value = "pastiche.png")]
    output: PathBuf,
    /// Optimizer steps
    #[arg(long, default_value_t = 500)]
    steps: usize,
    /// Weight on the content loss
    #[arg(long, default_value_t = 1.0)]
    content_weight: f32,
    /// Weight on the style loss (large by design; Gram matrices are unnormalized)
    #[arg(long, default_value_t = 1_000_000.0)]
    style_weight: f32,
    /// Adam learning rate
    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,
    /// Working resolution (shorter side, center-cropped square)
    #[arg(long, default_value_t = 224)]
    image_size: u32,
    /// Progress line cadence in steps
    #[arg(long, default_value_t = 50)]
    report_every: usize,
    /// Content layers, comma-separated (default: conv_4)
    #[arg(long, value_delimiter = ',')]
    content_layers: Option<Vec<String>>,
    /// Style layers, comma-separated (default: conv_1..conv_5)
    #[arg(long, value_delimiter = ',')]
    style_layers: Option<Vec<String>>,
    /// Start from noise instead of the content image
    #[arg(long)]
    noise: bool,
    /// Seed for noise initialization
    #[arg(long)]
    seed: Option<u64>,
    /// Pretrained extractor weights (.mpk); random weights if omitted
    #[arg(long, value_name = "PATH")]
    weights: Option<PathBuf>,
    /// Run on the CPU backend instead of wgpu
    #[arg(long)]
    cpu: bool,
    /// Save progress records to a JSON file
    #[arg(long, value_name = "PATH")]
    save_losses: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = if cli.cpu {
        run::<Autodiff<NdArray>>(&cli, &Default::default())
    } else {
        let device = burn::backend::wgpu::WgpuDevice::default();
        run::<Autodiff<Wgpu>>(&cli, &device)
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run<B: AutodiffBackend>(cli: &Cli, device: &B::Device) -> Result<()> {
    let mut config = TransferConfig {
        content_weight: cli.content_weight,
        style_weight: cli.style_weight,
        steps: cli.steps,
        report_every: cli.report_every,
        learning_rate: cli.learning_rate,
        image_size: cli.image_size,
        seed: cli.seed,
        ..Default::default()
    };
    if let Some(layers) = &cli.content_layers {
        config.content_layers = layers.clone();
    }
    if let Some(layers) = &cli.style_layers {
        config.style_layers = layers.clone();
    }
    if cli.noise {
        config.init = InitImage::Noise;
    }

    let mut extractor = FeatureExtractorConfig::new().init::<B>(device);
    match &cli.weights {
        Some(path) => extractor = weights::load(extractor, path, device)?,
        None => eprintln!("note: no --weights given, using a randomly initialized feature stack"),
    }

    let content = image_io::normalize::<B>(&image_io::load(&cli.content)?, cli.image_size, device)?;
    let style = image_io::normalize::<B>(&image_io::load(&cli.style)?, cli.image_size, device)?;

    let steps = config.steps;
    let mut transfer = transfer::begin(extractor, content, style, config)?;

    let mut records: Vec<ProgressRecord> = Vec::new();
    transfer.run(steps, |record| {
        println!(
            "step {:>5}/{}  loss {:.4}",
            record.step, record.total_steps, record.total_loss
        );
        records.push(record);
    })?;

    if let Some(path) = &cli.save_losses {
        let json = serde_json::to_string_pretty(&records)
            .expect("progress records always serialize");
        std::fs::write(path, json).map_err(|e| {
            pastiche::Error::config(format!("cannot write loss log '{}': {}", path.display(), e))
        })?;
        eprintln!("loss log written to {}", path.display());
    }

    let output = transfer.finish();
    image_io::save(&output, &cli.output)?;
    eprintln!("wrote {}", cli.output.display());
    Ok(())
}
