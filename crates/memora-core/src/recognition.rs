//! Recognition service: one uploaded photo in, one [`RecognitionResult`] out.
//!
//! Scans the reference gallery in order, asks the [`FaceVerifier`] about each
//! photo, and stops at the first match. Nothing is written; the gallery is
//! re-listed on every call.

use crate::frame::{Frame, FrameError};
use crate::gallery::{Gallery, GalleryError};
use crate::people::PersonDirectory;
use crate::verifier::{FaceVerifier, VerifyError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Outcome reported to the client. Serializes with a `status` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognitionResult {
    Success {
        name: String,
        relation: String,
        note: String,
    },
    Unknown,
    NoFace,
    Error {
        message: String,
    },
}

impl RecognitionResult {
    /// The `status` string this result serializes with.
    pub fn status(&self) -> &'static str {
        match self {
            RecognitionResult::Success { .. } => "success",
            RecognitionResult::Unknown => "unknown",
            RecognitionResult::NoFace => "no_face",
            RecognitionResult::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RecognitionResult::Error {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("upload: {0}")]
    Upload(FrameError),
    #[error("reference {name}: {source}")]
    Reference {
        name: String,
        #[source]
        source: FrameError,
    },
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl From<RecognitionError> for RecognitionResult {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::Verify(VerifyError::NoFace(_)) => RecognitionResult::NoFace,
            other => RecognitionResult::error(other.to_string()),
        }
    }
}

/// Matches uploads against a reference gallery.
pub struct RecognitionService<V> {
    verifier: V,
    gallery: Gallery,
    people: Arc<PersonDirectory>,
}

impl<V: FaceVerifier> RecognitionService<V> {
    pub fn new(verifier: V, gallery: Gallery, people: Arc<PersonDirectory>) -> Self {
        Self {
            verifier,
            gallery,
            people,
        }
    }

    /// Recognise the person in `upload`. Never fails: every error becomes a
    /// `no_face` or `error` result.
    pub fn recognize(&mut self, upload: &[u8]) -> RecognitionResult {
        match self.try_recognize(upload) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "recognition failed");
                err.into()
            }
        }
    }

    fn try_recognize(&mut self, upload: &[u8]) -> Result<RecognitionResult, RecognitionError> {
        let probe = Frame::decode(upload).map_err(RecognitionError::Upload)?;
        let references = self.gallery.entries()?;
        tracing::debug!(
            dir = %self.gallery.dir().display(),
            width = probe.width,
            height = probe.height,
            references = references.len(),
            "scanning gallery"
        );

        for reference in &references {
            let frame = Frame::open(&reference.path).map_err(|source| RecognitionError::Reference {
                name: reference.name.clone(),
                source,
            })?;

            let verification = self.verifier.verify(&probe, &frame)?;
            tracing::trace!(
                name = %reference.name,
                similarity = verification.similarity,
                verified = verification.verified,
                "compared"
            );

            if verification.verified {
                let record = self.people.resolve(&reference.name);
                tracing::info!(
                    name = %reference.name,
                    relation = %record.relation,
                    similarity = verification.similarity,
                    "match found"
                );
                return Ok(RecognitionResult::Success {
                    name: reference.name.clone(),
                    relation: record.relation,
                    note: record.note,
                });
            }
        }

        tracing::info!(scanned = references.len(), "no match in gallery");
        Ok(RecognitionResult::Unknown)
    }
}
