//! Face gallery recognition.
//!
//! Matches an uploaded photo against a directory of reference photos and
//! resolves the matched person through a static person table. Verification
//! runs SCRFD for face detection and ArcFace for embeddings, both via ONNX
//! Runtime on the CPU, behind the [`FaceVerifier`] trait.

pub mod alignment;
pub mod detector;
pub mod frame;
pub mod gallery;
pub mod people;
pub mod recognition;
pub mod recognizer;
pub mod types;
pub mod verifier;

use std::path::PathBuf;

pub use frame::{Frame, FrameError};
pub use gallery::{Gallery, GalleryError, ReferenceImage};
pub use people::{DirectoryError, PersonDirectory, PersonRecord};
pub use recognition::{RecognitionError, RecognitionResult, RecognitionService};
pub use types::{BoundingBox, Embedding, Verification};
pub use verifier::{FaceVerifier, ImageRole, OnnxVerifier, VerifyError, DEFAULT_SIMILARITY_THRESHOLD};

/// File name of the SCRFD detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the ArcFace recognition model inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

/// Default model directory: `$XDG_DATA_HOME/memora/models`, falling back to
/// `~/.local/share/memora/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("memora")
        .join("models")
}
