use image::RgbImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use veriface_core::{Verdict, Verifier};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("verifier: {0}")]
    Verifier(#[from] veriface_core::verifier::VerifierError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Verify {
        document: RgbImage,
        selfie: RgbImage,
        reply: oneshot::Sender<Verdict>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request verification of a document/selfie pair.
    pub async fn verify(
        &self,
        document: RgbImage,
        selfie: RgbImage,
    ) -> Result<Verdict, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Verify {
                document,
                selfie,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

#[cfg(test)]
impl EngineHandle {
    /// Handle answering every request with a canned verdict (no models loaded).
    pub(crate) fn stub(verdict: Verdict) -> Self {
        let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);
        tokio::spawn(async move {
            while let Some(EngineRequest::Verify { reply, .. }) = rx.recv().await {
                let _ = reply.send(verdict.clone());
            }
        });
        Self { tx }
    }
}

/// Spawn the verification engine on a dedicated OS thread.
///
/// Loads all ONNX models synchronously (fail-fast at startup), then enters
/// a request loop. The models live on this one thread for the life of the
/// process; requests are serialized through the channel.
pub fn spawn_engine(
    paths: &veriface_core::ModelPaths,
    similarity_threshold: f32,
) -> Result<EngineHandle, EngineError> {
    let mut verifier = Verifier::load(paths, similarity_threshold)?;
    tracing::info!(?paths, "verification models loaded");

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("veriface-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Verify {
                        document,
                        selfie,
                        reply,
                    } => {
                        let verdict = verifier.verify(&document, &selfie);
                        let _ = reply.send(verdict);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}
