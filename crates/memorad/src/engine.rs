use memora_core::{FaceVerifier, RecognitionResult, RecognitionService};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests the engine will queue before senders wait.
const ENGINE_QUEUE_DEPTH: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Recognize {
        upload: Vec<u8>,
        request_id: String,
        reply: oneshot::Sender<RecognitionResult>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run a recognition on the engine thread and wait for the result.
    pub async fn recognize(
        &self,
        upload: Vec<u8>,
        request_id: String,
    ) -> Result<RecognitionResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Recognize {
                upload,
                request_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the recognition service on a dedicated OS thread.
///
/// Model sessions need exclusive access, so every recognition runs here, one
/// at a time. The thread exits once every [`EngineHandle`] is dropped.
pub fn spawn_engine<V>(mut service: RecognitionService<V>) -> Result<EngineHandle, EngineError>
where
    V: FaceVerifier + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("memora-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Recognize {
                        upload,
                        request_id,
                        reply,
                    } => {
                        let span = tracing::info_span!("recognize", %request_id, bytes = upload.len());
                        let _guard = span.enter();
                        let started = std::time::Instant::now();
                        let result = panic::catch_unwind(AssertUnwindSafe(|| service.recognize(&upload)))
                            .unwrap_or_else(|payload| {
                                let message = panic_message(payload.as_ref());
                                tracing::error!(%message, "recognition panicked");
                                RecognitionResult::error(format!("internal error: {message}"))
                            });
                        tracing::info!(
                            status = result.status(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "recognition complete"
                        );
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use memora_core::{Frame, Gallery, PersonDirectory, Verification, VerifyError};
    use std::sync::Arc;

    struct AlwaysMatch;

    impl FaceVerifier for AlwaysMatch {
        fn verify(&mut self, _: &Frame, _: &Frame) -> Result<Verification, VerifyError> {
            Ok(Verification::from_similarity(1.0, 0.4))
        }
    }

    fn engine(dir: &std::path::Path) -> EngineHandle {
        let service = RecognitionService::new(
            AlwaysMatch,
            Gallery::new(dir),
            Arc::new(PersonDirectory::builtin().unwrap()),
        );
        spawn_engine(service).unwrap()
    }

    #[tokio::test]
    async fn test_engine_reports_decode_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = engine(tmp.path())
            .recognize(b"garbage".to_vec(), "req-1".into())
            .await
            .unwrap();
        assert_eq!(result.status(), "error");
    }

    #[tokio::test]
    async fn test_engine_returns_match() {
        let tmp = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([90, 90, 90]));
        img.save(tmp.path().join("Keshava.png")).unwrap();

        let mut upload = std::io::Cursor::new(Vec::new());
        image::DynamicImage::from(img)
            .write_to(&mut upload, image::ImageFormat::Png)
            .unwrap();

        let result = engine(tmp.path())
            .recognize(upload.into_inner(), "req-2".into())
            .await
            .unwrap();
        assert_eq!(
            result,
            RecognitionResult::Success {
                name: "Keshava".into(),
                relation: "DR. KESHAVA".into(),
                note: "Your Cardiologist. Appointment on Friday.".into(),
            }
        );
    }

    /// Panics on its first comparison, then matches everything.
    struct PanicsOnce {
        panicked: bool,
    }

    impl FaceVerifier for PanicsOnce {
        fn verify(&mut self, _: &Frame, _: &Frame) -> Result<Verification, VerifyError> {
            if !self.panicked {
                self.panicked = true;
                panic!("output index out of range");
            }
            Ok(Verification::from_similarity(1.0, 0.4))
        }
    }

    #[tokio::test]
    async fn test_engine_survives_verifier_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([30, 60, 90]));
        img.save(tmp.path().join("Shrey.png")).unwrap();
        let mut upload = std::io::Cursor::new(Vec::new());
        image::DynamicImage::from(img)
            .write_to(&mut upload, image::ImageFormat::Png)
            .unwrap();
        let upload = upload.into_inner();

        let service = RecognitionService::new(
            PanicsOnce { panicked: false },
            Gallery::new(tmp.path()),
            Arc::new(PersonDirectory::builtin().unwrap()),
        );
        let handle = spawn_engine(service).unwrap();

        let first = handle.recognize(upload.clone(), "req-a".into()).await.unwrap();
        assert_eq!(
            first,
            RecognitionResult::error("internal error: output index out of range")
        );

        let second = handle.recognize(upload, "req-b".into()).await.unwrap();
        assert_eq!(second.status(), "success");
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "unknown panic");
    }

    #[tokio::test]
    async fn test_engine_serves_concurrent_callers() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = engine(tmp.path());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8u8 {
            let handle = handle.clone();
            tasks.spawn(async move { handle.recognize(vec![i], format!("req-{i}")).await });
        }
        let mut answered = 0;
        while let Some(joined) = tasks.join_next().await {
            assert_eq!(joined.unwrap().unwrap().status(), "error");
            answered += 1;
        }
        assert_eq!(answered, 8);
    }
}
