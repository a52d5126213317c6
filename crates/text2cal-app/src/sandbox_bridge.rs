use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kanal::{AsyncReceiver, AsyncSender};
use text2cal_config::ApiKeys;
use text2cal_providers::{OcrProvider, ProviderError, ProviderOutput};
use text2cal_types::{
    DebugTrace, ImageRef, JobOutcome, NOT_INITIALIZED, OcrProviderId, SegmentationMode,
    WorkerCommand, WorkerEvent, WorkerFault,
};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

/// Last readiness announcement heard from the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxStatus {
    Pending,
    Ready,
    Failed(String),
}

type PendingJobs = Arc<Mutex<HashMap<Uuid, oneshot::Sender<JobOutcome>>>>;

/// Coordinator side of the sandbox channel pair. Registered as the local
/// OCR provider; each call becomes one job keyed by a fresh job id.
pub struct SandboxBridge {
    commands: AsyncSender<WorkerCommand>,
    pending: PendingJobs,
    status: watch::Receiver<SandboxStatus>,
}

impl SandboxBridge {
    /// Starts the task that routes worker events back to callers
    pub fn new(commands: AsyncSender<WorkerCommand>, events: AsyncReceiver<WorkerEvent>) -> Self {
        let pending = PendingJobs::default();
        let (status_tx, status) = watch::channel(SandboxStatus::Pending);
        tokio::spawn(route_events(events, pending.clone(), status_tx));

        Self {
            commands,
            pending,
            status,
        }
    }

    pub fn status(&self) -> SandboxStatus {
        self.status.borrow().clone()
    }

    /// Waits for the first readiness announcement
    pub async fn announced(&self) -> SandboxStatus {
        let mut status = self.status.clone();
        match status.wait_for(|s| *s != SandboxStatus::Pending).await {
            Ok(s) => s.clone(),
            Err(_) => SandboxStatus::Failed("Sandbox went away".to_string()),
        }
    }

    pub async fn ping(&self) -> Result<(), ProviderError> {
        self.commands
            .send(WorkerCommand::Ping)
            .await
            .map_err(|e| ProviderError::Worker(format!("Sandbox unreachable: {e}")))
    }

    async fn submit(&self, image: String, mode: SegmentationMode) -> Result<String, ProviderError> {
        let job_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ProviderError::Worker("Sandbox job table poisoned".to_string()))?
            .insert(job_id, tx);

        let sent = self
            .commands
            .send(WorkerCommand::RunOcrJob {
                job_id,
                image,
                mode,
            })
            .await;
        if let Err(e) = sent {
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&job_id);
            }
            return Err(ProviderError::Worker(format!("Sandbox unreachable: {e}")));
        }

        match rx.await {
            Ok(JobOutcome::Text(text)) => Ok(text),
            Ok(JobOutcome::Failed(WorkerFault::NotInitialized)) => Err(ProviderError::NotReady(
                WorkerFault::NotInitialized.to_string(),
            )),
            Ok(JobOutcome::Failed(fault)) => Err(ProviderError::Worker(fault.to_string())),
            Err(_) => Err(ProviderError::Worker(
                "Sandbox dropped the job without a result".to_string(),
            )),
        }
    }
}

#[async_trait]
impl OcrProvider for SandboxBridge {
    fn id(&self) -> OcrProviderId {
        OcrProviderId::Local
    }

    async fn run(
        &self,
        image: &ImageRef,
        _keys: &ApiKeys,
    ) -> Result<ProviderOutput<String>, ProviderError> {
        if !image.is_inline() {
            return Err(ProviderError::InvalidInput(
                "Local OCR needs an inline image".to_string(),
            ));
        }

        let text = self
            .submit(image.to_string(), SegmentationMode::default())
            .await?;
        Ok(ProviderOutput {
            result: text,
            trace: DebugTrace::local(OcrProviderId::Local.as_str()),
        })
    }
}

async fn route_events(
    events: AsyncReceiver<WorkerEvent>,
    pending: PendingJobs,
    status: watch::Sender<SandboxStatus>,
) {
    while let Ok(event) = events.recv().await {
        match event {
            WorkerEvent::Ready { error: None } => {
                tracing::info!("[COORDINATOR] Sandbox ready");
                status.send_replace(SandboxStatus::Ready);
            }
            WorkerEvent::Ready { error: Some(error) } if error == NOT_INITIALIZED => {
                tracing::debug!("[COORDINATOR] Sandbox still initializing");
            }
            WorkerEvent::Ready { error: Some(error) } => {
                tracing::warn!("[COORDINATOR] Sandbox not ready: {}", error);
                status.send_replace(SandboxStatus::Failed(error));
            }
            WorkerEvent::JobResult { job_id, outcome } => {
                let waiter = pending.lock().ok().and_then(|mut p| p.remove(&job_id));
                match waiter {
                    Some(waiter) => {
                        let _ = waiter.send(outcome);
                    }
                    None => tracing::warn!("[COORDINATOR] Result for unknown job {}", job_id),
                }
            }
        }
    }
    tracing::debug!("[COORDINATOR] Sandbox event channel closed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    const IMAGE: &str = "data:image/png;base64,AAAA";

    /// Answers every job with `outcome` after announcing `ready`
    fn fake_worker(ready: Option<String>, outcome: JobOutcome) -> SandboxBridge {
        let (command_tx, command_rx) = kanal::unbounded_async::<WorkerCommand>();
        let (event_tx, event_rx) = kanal::unbounded_async();

        tokio::spawn(async move {
            event_tx
                .send(WorkerEvent::Ready { error: ready })
                .await
                .unwrap();
            while let Ok(command) = command_rx.recv().await {
                if let WorkerCommand::RunOcrJob { job_id, .. } = command {
                    event_tx
                        .send(WorkerEvent::JobResult {
                            job_id,
                            outcome: outcome.clone(),
                        })
                        .await
                        .unwrap();
                }
            }
        });

        SandboxBridge::new(command_tx, event_rx)
    }

    #[tokio::test]
    async fn test_job_result_reaches_caller() {
        let bridge = fake_worker(None, JobOutcome::Text("Lunch 12:30".into()));
        assert_eq!(bridge.announced().await, SandboxStatus::Ready);

        let output = timeout(
            Duration::from_secs(1),
            bridge.run(&ImageRef::parse(IMAGE), &ApiKeys::default()),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(output.result, "Lunch 12:30");
        assert_eq!(output.trace, DebugTrace::local("local"));
    }

    #[tokio::test]
    async fn test_not_initialized_maps_to_not_ready() {
        let bridge = fake_worker(
            Some("core missing".into()),
            JobOutcome::Failed(WorkerFault::NotInitialized),
        );
        assert_eq!(
            bridge.announced().await,
            SandboxStatus::Failed("core missing".into())
        );

        let err = bridge
            .run(&ImageRef::parse(IMAGE), &ApiKeys::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NotReady(_)));
        assert_eq!(err.to_string(), "Sandbox not initialized");
    }

    #[tokio::test]
    async fn test_remote_image_is_rejected_locally() {
        let bridge = fake_worker(None, JobOutcome::Text(String::new()));
        let err = bridge
            .run(&ImageRef::parse("https://example.com/a.png"), &ApiKeys::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_initializing_answer_keeps_status_pending() {
        let (command_tx, _command_rx) = kanal::unbounded_async::<WorkerCommand>();
        let (event_tx, event_rx) = kanal::unbounded_async();
        let bridge = SandboxBridge::new(command_tx, event_rx);

        event_tx
            .send(WorkerEvent::Ready {
                error: Some(NOT_INITIALIZED.into()),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bridge.status(), SandboxStatus::Pending);

        event_tx
            .send(WorkerEvent::Ready { error: None })
            .await
            .unwrap();
        let status = timeout(Duration::from_secs(1), bridge.announced())
            .await
            .unwrap();
        assert_eq!(status, SandboxStatus::Ready);
    }
}
