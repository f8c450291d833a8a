use std::path::PathBuf;
use veriface_core::face::DEFAULT_SIMILARITY_THRESHOLD;
use veriface_core::ModelPaths;

/// Default listen port.
const DEFAULT_PORT: u16 = 8000;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive face match.
    pub similarity_threshold: f32,
}

impl Config {
    /// Load configuration from `VERIFACE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("VERIFACE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/share/veriface/models"));

        Self {
            port: env_u16("VERIFACE_PORT", DEFAULT_PORT),
            model_dir,
            similarity_threshold: env_f32(
                "VERIFACE_SIMILARITY_THRESHOLD",
                DEFAULT_SIMILARITY_THRESHOLD,
            ),
        }
    }

    /// Model artifact paths under the configured model directory.
    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths::in_dir(&self.model_dir)
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
