use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use veriface_core::face::DEFAULT_SIMILARITY_THRESHOLD;
use veriface_core::{decode_image, ModelPaths, Verifier};

#[derive(Parser)]
#[command(name = "veriface", about = "veriface identity verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a document/selfie pair and print the verdict as JSON
    Verify {
        /// Path to the identity document image
        #[arg(short, long)]
        document: PathBuf,
        /// Path to the selfie image
        #[arg(short, long)]
        selfie: PathBuf,
        /// Directory containing the ONNX model files
        #[arg(long, default_value = "/usr/share/veriface/models")]
        model_dir: PathBuf,
        /// Cosine similarity threshold for a positive face match
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            document,
            selfie,
            model_dir,
            threshold,
        } => {
            let document_bytes = std::fs::read(&document)
                .with_context(|| format!("reading {}", document.display()))?;
            let selfie_bytes = std::fs::read(&selfie)
                .with_context(|| format!("reading {}", selfie.display()))?;

            let document = decode_image(&document_bytes)
                .with_context(|| format!("decoding {}", document.display()))?;
            let selfie = decode_image(&selfie_bytes)
                .with_context(|| format!("decoding {}", selfie.display()))?;

            let mut verifier = Verifier::load(&ModelPaths::in_dir(&model_dir), threshold)
                .context("loading models")?;

            let verdict = verifier.verify(&document, &selfie);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}
