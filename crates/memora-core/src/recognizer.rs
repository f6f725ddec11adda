//! ArcFace face recognizer via ONNX Runtime.
//!
//! Extracts 512-dimensional face embeddings from aligned RGB face crops,
//! using the w600k_r50 ArcFace model.

use crate::alignment::{self, ALIGNED_SIZE};
use crate::frame::Frame;
use crate::types::{BoundingBox, Embedding};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric, unlike SCRFD's 128.0
const ARCFACE_EMBEDDING_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0}; download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face has no landmarks; detector must return landmarks for alignment")]
    NoLandmarks,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face recognizer.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Extract an L2-normalized embedding for a detected face.
    ///
    /// The face must carry landmarks; it is aligned to the canonical 112×112
    /// position before inference.
    pub fn extract(&mut self, frame: &Frame, face: &BoundingBox) -> Result<Embedding, RecognizerError> {
        let landmarks = face.landmarks.as_ref().ok_or(RecognizerError::NoLandmarks)?;

        let aligned = alignment::align_face(frame, landmarks);
        let input = Self::preprocess(&aligned);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        Ok(Embedding {
            values: l2_normalize(raw_data.to_vec())?,
        })
    }

    /// Convert a 112×112 interleaved RGB crop into a normalized NCHW tensor.
    fn preprocess(aligned_face: &[u8]) -> Array4<f32> {
        let size = ALIGNED_SIZE;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (i, px) in aligned_face.chunks_exact(3).take(size * size).enumerate() {
            let (y, x) = (i / size, i % size);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (px[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            }
        }

        tensor
    }
}

fn l2_normalize(raw: Vec<f32>) -> Result<Vec<f32>, RecognizerError> {
    if raw.len() != ARCFACE_EMBEDDING_DIM {
        return Err(RecognizerError::InferenceFailed(format!(
            "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
            raw.len()
        )));
    }

    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        Ok(raw.iter().map(|x| x / norm).collect())
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_output_shape() {
        let aligned = vec![128u8; ALIGNED_SIZE * ALIGNED_SIZE * 3];
        let tensor = FaceRecognizer::preprocess(&aligned);
        assert_eq!(tensor.shape(), &[1, 3, ALIGNED_SIZE, ALIGNED_SIZE]);
    }

    #[test]
    fn test_preprocess_channel_planes() {
        // Interleaved RGB lands in separate planes, each normalized
        let aligned = [255u8, 127, 0].repeat(ALIGNED_SIZE * ALIGNED_SIZE);
        let tensor = FaceRecognizer::preprocess(&aligned);
        assert!((tensor[[0, 0, 5, 7]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 5, 7]] - (127.0 - ARCFACE_MEAN) / ARCFACE_STD).abs() < 1e-6);
        assert!((tensor[[0, 2, 111, 111]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_short_input_zero_pads() {
        let tensor = FaceRecognizer::preprocess(&[255, 255, 255]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 1]], 0.0);
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut raw = vec![0.0f32; ARCFACE_EMBEDDING_DIM];
        raw[0] = 3.0;
        raw[1] = 4.0;
        let values = l2_normalize(raw).unwrap();
        assert!((values[0] - 0.6).abs() < 1e-6);
        assert!((values[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_rejects_wrong_dim() {
        let err = l2_normalize(vec![1.0; 128]).unwrap_err();
        assert!(err.to_string().contains("expected 512-dim embedding, got 128"));
    }
}
