use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on (default: 127.0.0.1:8000).
    pub bind_addr: SocketAddr,
    /// Directory of reference photos, one person per file (default: known_faces).
    pub gallery_dir: PathBuf,
    /// Person table override; the built-in table is used when unset.
    pub people_file: Option<PathBuf>,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub similarity_threshold: f32,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from `MEMORA_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: parse_or(var("MEMORA_BIND_ADDR"), SocketAddr::from(DEFAULT_BIND_ADDR)),
            gallery_dir: var("MEMORA_GALLERY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("known_faces")),
            people_file: var("MEMORA_PEOPLE_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            model_dir: var("MEMORA_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(memora_core::default_model_dir),
            similarity_threshold: parse_or(
                var("MEMORA_SIMILARITY_THRESHOLD"),
                memora_core::DEFAULT_SIMILARITY_THRESHOLD,
            ),
            max_upload_bytes: parse_or(var("MEMORA_MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join(memora_core::SCRFD_MODEL_FILE)
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> PathBuf {
        self.model_dir.join(memora_core::ARCFACE_MODEL_FILE)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
