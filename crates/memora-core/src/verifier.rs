//! Pairwise face verification.
//!
//! [`FaceVerifier`] is the seam between the recognition service and whatever
//! decides whether two photos show the same person. [`OnnxVerifier`] is the
//! production implementation: SCRFD detection, landmark alignment, ArcFace
//! embeddings and a cosine-similarity threshold.

use crate::detector::{DetectorError, FaceDetector};
use crate::frame::Frame;
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding, Verification};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Default cosine similarity threshold for a positive match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.40;

/// Which side of a verification call an image was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// The uploaded photo.
    Probe,
    /// A photo from the reference gallery.
    Reference,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Probe => f.write_str("probe"),
            ImageRole::Reference => f.write_str("reference"),
        }
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("no face detected in {0} image")]
    NoFace(ImageRole),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Decides whether a probe image and a reference image show the same face.
///
/// Implementations must fail with [`VerifyError::NoFace`] when either image
/// has no detectable face.
pub trait FaceVerifier {
    fn verify(&mut self, probe: &Frame, reference: &Frame) -> Result<Verification, VerifyError>;
}

/// SCRFD + ArcFace verifier running on ONNX Runtime.
///
/// The probe embedding is cached, so scanning a gallery of N photos for one
/// upload costs N + 1 embeddings rather than 2N.
pub struct OnnxVerifier {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    threshold: f32,
    probe_cache: ProbeCache,
}

impl OnnxVerifier {
    /// Load both models. Fails fast if either file is missing or invalid.
    pub fn load(scrfd_path: &Path, arcface_path: &Path, threshold: f32) -> Result<Self, VerifyError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let recognizer = FaceRecognizer::load(arcface_path)?;
        tracing::info!(threshold, "ONNX verifier ready");
        Ok(Self {
            detector,
            recognizer,
            threshold,
            probe_cache: ProbeCache::default(),
        })
    }
}

impl FaceVerifier for OnnxVerifier {
    fn verify(&mut self, probe: &Frame, reference: &Frame) -> Result<Verification, VerifyError> {
        let (detector, recognizer) = (&mut self.detector, &mut self.recognizer);
        let probe_embedding = self
            .probe_cache
            .get_or_try_insert(probe, |frame| embed(detector, recognizer, frame, ImageRole::Probe))?;
        let reference_embedding = embed(detector, recognizer, reference, ImageRole::Reference)?;
        let similarity = probe_embedding.similarity(&reference_embedding);
        Ok(Verification::from_similarity(similarity, self.threshold))
    }
}

/// Embed the most confident face in `frame`.
fn embed(
    detector: &mut FaceDetector,
    recognizer: &mut FaceRecognizer,
    frame: &Frame,
    role: ImageRole,
) -> Result<Embedding, VerifyError> {
    let face = best_face(detector.detect(frame)?).ok_or(VerifyError::NoFace(role))?;
    tracing::debug!(%role, confidence = face.confidence, "face selected");
    Ok(recognizer.extract(frame, &face)?)
}

/// Embedding of the most recently seen probe frame. Failures are not cached.
#[derive(Default)]
struct ProbeCache {
    entry: Option<(Frame, Embedding)>,
}

impl ProbeCache {
    fn get_or_try_insert<E>(
        &mut self,
        frame: &Frame,
        embed: impl FnOnce(&Frame) -> Result<Embedding, E>,
    ) -> Result<Embedding, E> {
        if let Some((cached, embedding)) = &self.entry {
            if same_frame(cached, frame) {
                return Ok(embedding.clone());
            }
        }
        self.entry = None;
        let embedding = embed(frame)?;
        self.entry = Some((frame.clone(), embedding.clone()));
        Ok(embedding)
    }
}

fn same_frame(a: &Frame, b: &Frame) -> bool {
    a.width == b.width && a.height == b.height && a.data == b.data
}

/// Highest-confidence face with landmarks. Detector output is already sorted.
fn best_face(faces: Vec<BoundingBox>) -> Option<BoundingBox> {
    faces.into_iter().find(|f| f.landmarks.is_some())
}
