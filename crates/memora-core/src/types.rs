/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Cosine similarity between two embeddings, in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }
}

/// Outcome of comparing one probe face against one reference face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    /// Whether the two faces are judged to be the same person.
    pub verified: bool,
    /// Cosine similarity of the two embeddings [-1, 1].
    pub similarity: f32,
}

impl Verification {
    /// Apply a similarity threshold: `similarity >= threshold` is a match.
    pub fn from_similarity(similarity: f32, threshold: f32) -> Self {
        Self {
            verified: similarity >= threshold,
            similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding { values: values.to_vec() }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = emb(&[1.0, 0.0, 0.0]);
        assert!((a.similarity(&a.clone()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert!(emb(&[1.0, 0.0]).similarity(&emb(&[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        assert!((emb(&[1.0, 0.0]).similarity(&emb(&[-1.0, 0.0])) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(emb(&[0.0, 0.0]).similarity(&emb(&[1.0, 0.0])), 0.0);
    }

    #[test]
    fn test_cosine_similarity_scale_invariant() {
        let a = emb(&[1.0, 2.0, 3.0]);
        let b = emb(&[2.0, 4.0, 6.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_verification_threshold_is_inclusive() {
        assert!(Verification::from_similarity(0.40, 0.40).verified);
        assert!(!Verification::from_similarity(0.39, 0.40).verified);
        assert!(Verification::from_similarity(0.95, 0.40).verified);
    }
}
