use anyhow::Context;
use chrono::Local;
use clap::Parser;
use inference::{
    AnalysisRecord, AnalyzerConfig, DecodedResult, InferencePipeline, JsonlSink, LogSink,
    ModelHandle, ModelKind, RecordSink, backend::InferenceBackend, image_source::open_image,
    logging::setup_logging,
};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

#[cfg(feature = "ort-backend")]
use inference::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("The 'ort-backend' feature must be enabled to build the riceeye binary");

/// Identify rice varieties in grain photos.
#[derive(Parser, Debug)]
#[command(name = "riceeye", version)]
struct Args {
    /// Image files to analyze
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Model artifact (overrides MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output contract of the model (overrides MODEL_KIND)
    #[arg(long)]
    kind: Option<ModelKind>,

    /// Detector confidence threshold (overrides CONFIDENCE_THRESHOLD)
    #[arg(long)]
    threshold: Option<f32>,

    /// Append one record per image to this JSON-lines file (overrides RECORDS_PATH)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Save records without running the model
    #[arg(long, requires = "save")]
    unanalyzed: bool,

    /// Delete every stored record before saving new ones
    #[arg(long, requires = "save")]
    clear: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AnalyzerConfig::from_env()?;
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(kind) = args.kind {
        config.model_kind = kind;
    }
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(save) = args.save {
        config.records_path = Some(save);
    }
    config.validate()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(config = ?config, "Loaded configuration");

    let sink: Box<dyn RecordSink> = match &config.records_path {
        Some(path) => {
            let sink = JsonlSink::open(path)
                .with_context(|| format!("Failed to open records file {}", path.display()))?;
            if args.clear {
                sink.clear()?;
            }
            Box::new(sink)
        }
        None => Box::new(LogSink),
    };

    if args.unanalyzed {
        for path in &args.images {
            sink.insert(AnalysisRecord::unanalyzed(image_uri(path), Local::now()));
        }
        tracing::info!(count = args.images.len(), "Saved unanalyzed records");
        return Ok(());
    }

    let handle = load_model::<Backend>(&config)?;
    let pipeline = InferencePipeline::from_config(handle, &config);

    let mut failures = 0usize;
    for path in &args.images {
        let image = match open_image(path) {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %format!("{:#}", e),
                    "Skipping image"
                );
                failures += 1;
                continue;
            }
        };

        match pipeline.submit(image).outcome().await {
            Some(Ok(analysis)) => {
                print_analysis(path, &analysis.result);
                sink.insert(analysis.to_record(image_uri(path)));
            }
            Some(Err(e)) => {
                eprintln!("{}: {} ({})", path.display(), e, e.kind());
                failures += 1;
            }
            None => break,
        }
    }

    pipeline.close();

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, args.images.len());
    }
    Ok(())
}

fn load_model<B: InferenceBackend>(config: &AnalyzerConfig) -> anyhow::Result<ModelHandle<B>> {
    let file = File::open(&config.model_path)
        .with_context(|| format!("Failed to open model {}", config.model_path.display()))?;
    // SAFETY: the artifact is opened read-only and only read while the map is alive.
    let artifact = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map model {}", config.model_path.display()))?;

    tracing::info!(
        path = %config.model_path.display(),
        kind = %config.model_kind,
        "Loading model"
    );

    Ok(ModelHandle::load(&artifact, &config.backend_options())?)
}

fn image_uri(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn print_analysis(path: &Path, result: &DecodedResult) {
    let (label, confidence) = result.summary();
    println!("{}: {} ({})", path.display(), label, confidence);

    match result {
        DecodedResult::Classification(classification) => {
            println!("{}", classification.confidence_report());
        }
        DecodedResult::Detections { detections } => {
            for d in detections {
                println!(
                    "  {} {:.2}% [{:.1}, {:.1}, {:.1}, {:.1}]",
                    d.label,
                    d.confidence * 100.0,
                    d.x1,
                    d.y1,
                    d.x2,
                    d.y2
                );
            }
        }
    }
}
