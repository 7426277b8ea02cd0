use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vlm_extract::{
    Config, ErrorKind, ExtractionOutcome, ExtractionPipeline, Provider, VlmExtractError,
};

#[derive(Parser)]
#[command(name = "vlm-extract")]
#[command(about = "Extract text from images and documents using Vision Language Models")]
struct Args {
    /// File to extract text from
    file: PathBuf,

    /// Override the configured provider (ollama, openai, localai)
    #[arg(long)]
    provider: Option<Provider>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vlm_extract=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(provider) = args.provider {
        config = config.with_provider(provider);
    }

    tracing::info!("vlm-extract");
    tracing::info!("  File:     {}", args.file.display());
    tracing::info!("  Provider: {}", config.vlm.provider);
    tracing::info!("  Model:    {}", config.vlm.model);
    if let Some(base_url) = &config.vlm.base_url {
        tracing::info!("  Base URL: {}", base_url);
    }

    let pipeline = match ExtractionPipeline::new(&config) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            eprintln!("Error: {error}");
            print_remediation(&error);
            std::process::exit(1);
        }
    };

    tracing::info!("Extracting text...");
    let result = pipeline.extract(&args.file).await;

    match result.outcome {
        ExtractionOutcome::Succeeded { text, method } => {
            tracing::info!("Extraction succeeded (method: {})", method);
            println!("{text}");
            Ok(())
        }
        ExtractionOutcome::Failed { error } => {
            eprintln!("Error: {error}");
            if matches!(error.kind(), ErrorKind::Transient | ErrorKind::Timeout)
                && !pipeline.provider().health_check().await
            {
                eprintln!(
                    "The {} backend did not answer a health check.",
                    pipeline.provider().name()
                );
            }
            print_remediation(&error);
            std::process::exit(1);
        }
    }
}

fn print_remediation(error: &VlmExtractError) {
    eprintln!("\nTroubleshooting:");
    match error.kind() {
        ErrorKind::Transient | ErrorKind::Timeout => {
            eprintln!("1. Make sure the VLM backend is running (for Ollama: ollama serve)");
            eprintln!("2. Check VLM_BASE_URL points at the right host");
            eprintln!("3. Raise VLM_TIMEOUT if large documents keep timing out");
        }
        ErrorKind::Auth => {
            eprintln!("1. Check that VLM_API_KEY is set and valid");
            eprintln!("2. Verify the key has access to the configured model");
        }
        ErrorKind::UnsupportedModel => {
            eprintln!("1. Verify VLM_MODEL names a vision-capable model");
            eprintln!("2. For Ollama, pull the model first: ollama pull <model>");
        }
        ErrorKind::UnsupportedFormat => {
            eprintln!("1. Supported images: PNG, JPEG, GIF, BMP, WebP, TIFF, HEIC");
            eprintln!("2. Supported documents: PDF, DOCX, PPTX, XLSX, EPUB, HTML");
        }
        ErrorKind::Render => {
            eprintln!("1. Install the converter named in the error message");
            eprintln!("2. poppler-utils handles PDF pages; libreoffice handles office files");
        }
        ErrorKind::PdfExtraction => {
            eprintln!("1. The PDF text layer could not be read; it may be corrupt or encrypted");
            eprintln!("2. Set PDF_FALLBACK_TO_VLM=true to route such files to the VLM instead");
        }
        ErrorKind::Config => {
            eprintln!("1. Review the VLM_* environment variables");
        }
        ErrorKind::FileTooLarge => {
            eprintln!("1. Raise MAX_FILE_SIZE_MB or shrink the input");
        }
        ErrorKind::Io | ErrorKind::MalformedResponse => {
            eprintln!("1. Check the file path exists and is readable");
            eprintln!("2. Re-run with RUST_LOG=vlm_extract=debug for details");
        }
    }
}
