use std::path::PathBuf;
use std::process;

use clap::Parser;

use camfilter_core::blurring::domain::gpu_backend::GpuBackend;
use camfilter_core::blurring::infrastructure::backend_factory::{create_backend, BackendKind};
use camfilter_core::compositing::chain_config::ChainConfig;
use camfilter_core::filtering::domain::filter_kind::FilterKind;
use camfilter_core::filtering::domain::filter_spec::FilterSpec;
use camfilter_core::pipeline::frame_pipeline::FramePipeline;
use camfilter_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use camfilter_core::shared::constants::DEFAULT_MAX_BLUR_RADIUS;
use camfilter_core::video::infrastructure::image_file_writer::ImageFileWriter;
use camfilter_core::video::infrastructure::image_sequence_reader::{
    has_image_extension, ImageSequenceReader,
};

/// Applies grayscale, sepia, blur and invert filters to images and frame
/// sequences.
#[derive(Parser)]
#[command(name = "camfilter")]
struct Cli {
    /// Input image file, or a directory of frames processed in name order.
    input: PathBuf,

    /// Output image file, or a directory for numbered frames.
    output: PathBuf,

    /// Grayscale intensity (0.0-1.0); the bare flag means 1.0.
    #[arg(long, num_args = 0..=1, default_missing_value = "1.0")]
    grayscale: Option<f32>,

    /// Sepia intensity (0.0-1.0); the bare flag means 1.0.
    #[arg(long, num_args = 0..=1, default_missing_value = "1.0")]
    sepia: Option<f32>,

    /// Blur intensity (0.0-1.0); the radius is floor(blur-radius * intensity).
    #[arg(long, num_args = 0..=1, default_missing_value = "1.0")]
    blur: Option<f32>,

    /// Invert intensity (0.0-1.0); the bare flag means 1.0.
    #[arg(long, num_args = 0..=1, default_missing_value = "1.0")]
    invert: Option<f32>,

    /// Maximum blur radius in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_BLUR_RADIUS)]
    blur_radius: u32,

    /// Blur backend: gpu, software or none.
    #[arg(long, default_value = "gpu")]
    backend: BackendKind,

    /// JSON filter preset; flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective filter preset to this file.
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Cli {
    fn flag_specs(&self) -> Vec<FilterSpec> {
        [
            (FilterKind::Grayscale, self.grayscale),
            (FilterKind::Sepia, self.sepia),
            (FilterKind::Blur, self.blur),
            (FilterKind::Invert, self.invert),
        ]
        .into_iter()
        .filter_map(|(kind, intensity)| {
            intensity.map(|v| match kind {
                FilterKind::Blur => FilterSpec::blur(v, self.blur_radius),
                _ => FilterSpec::new(kind, v),
            })
        })
        .collect()
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = effective_config(&cli)?;
    if config.filters.is_empty() {
        log::warn!("No filters requested; frames are copied unchanged");
    }

    let reader = ImageSequenceReader::open(&cli.input)?;
    let (width, height) = reader.first_dimensions()?;
    let backend = open_backend(&config, cli.backend)?;
    let chain = config.build(width, height, backend)?;

    let mut pipeline = FramePipeline::new(
        Box::new(reader),
        chain,
        Box::new(ImageFileWriter::new(&cli.output)),
        Box::new(StdoutPipelineLogger::default()),
        None,
    );
    pipeline.run()?;

    if let Some(path) = &cli.save_config {
        ChainConfig::from_chain(pipeline.chain()).save(path)?;
        log::info!("Saved filter preset to {}", path.display());
    }

    let frames = pipeline.finish();
    log::info!("Done: {frames} frame(s) written to {}", cli.output.display());
    Ok(())
}

/// Preset from `--config`, with command-line filters replacing its entries.
fn effective_config(cli: &Cli) -> Result<ChainConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ChainConfig::load(path)?,
        None => ChainConfig::default(),
    };
    for spec in cli.flag_specs() {
        config.filters.retain(|existing| existing.kind != spec.kind);
        config.filters.push(spec);
    }
    config.validate()?;
    Ok(config)
}

/// Opens a blur backend only when the preset uses a GPU filter. A missing
/// GPU is an error, never a silent switch to another backend.
fn open_backend(
    config: &ChainConfig,
    kind: BackendKind,
) -> Result<Option<Box<dyn GpuBackend>>, Box<dyn std::error::Error>> {
    if !config.filters.iter().any(|spec| spec.kind.is_gpu()) {
        return Ok(None);
    }
    match create_backend(kind) {
        Ok(backend) => Ok(backend),
        Err(e) => Err(format!(
            "Blur requested but the {kind} backend is unavailable: {e} (try --backend software)"
        )
        .into()),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    for (name, value) in [
        ("grayscale", cli.grayscale),
        ("sepia", cli.sepia),
        ("blur", cli.blur),
        ("invert", cli.invert),
    ] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(
                    format!("--{name} intensity must be between 0.0 and 1.0, got {v}").into(),
                );
            }
        }
    }
    if cli.blur_radius == 0 {
        return Err("Blur radius must be a positive integer".into());
    }
    if cli.blur.is_some() && cli.backend == BackendKind::None {
        return Err("--blur cannot be used with --backend none".into());
    }
    if cli.input.is_dir() && has_image_extension(&cli.output) {
        return Err(format!(
            "Output must be a directory when the input is a directory, got {}",
            cli.output.display()
        )
        .into());
    }
    Ok(())
}
