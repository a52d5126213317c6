use std::sync::Arc;

use anyhow::Context;
use kanal::{AsyncReceiver, AsyncSender};
use text2cal_capture::decode_data_url;
use text2cal_types::{JobOutcome, SegmentationMode, WorkerCommand, WorkerEvent, WorkerFault};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::{EngineCore, EngineLoader, Readiness};

pub struct SandboxWorker {
    loader: Arc<dyn EngineLoader>,
    readiness: Readiness,
    core: EngineCore,
}

impl SandboxWorker {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            readiness: Readiness::Uninitialized,
            core: EngineCore::Accelerated,
        }
    }

    fn settle(&mut self, (core, attempt): (EngineCore, anyhow::Result<()>)) {
        self.core = core;
        self.readiness = match attempt {
            Ok(()) => {
                tracing::info!("[SANDBOX] Engine ready on {:?} core", core);
                Readiness::Ready
            }
            Err(e) => {
                tracing::error!("[SANDBOX] Engine failed to initialize: {e:#}");
                Readiness::Failed(format!("{e:#}"))
            }
        };
    }

    fn announcement(&self) -> WorkerEvent {
        WorkerEvent::Ready {
            error: self.readiness.error(),
        }
    }

    /// Serves commands until the channel closes or `cancel` fires.
    /// Initialization starts immediately and is polled alongside the
    /// command channel, so pings report the current state and jobs sent
    /// before the engine is up fail instead of queueing. Jobs run on their
    /// own tasks so pings are answered while they work.
    pub async fn run(
        mut self,
        commands: AsyncReceiver<WorkerCommand>,
        events: AsyncSender<WorkerEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.readiness = Readiness::Initializing;
        let init = bring_up(self.loader.clone());
        tokio::pin!(init);
        let mut initializing = true;

        loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[SANDBOX] Shutting down");
                    return Ok(());
                }
                outcome = &mut init, if initializing => {
                    initializing = false;
                    self.settle(outcome);
                    events.send(self.announcement()).await?;
                    continue;
                }
                command = commands.recv() => match command {
                    Ok(command) => command,
                    Err(_) => {
                        tracing::debug!("[SANDBOX] Command channel closed");
                        return Ok(());
                    }
                },
            };

            match command {
                // once per worker lifetime; a repeat only re-announces
                WorkerCommand::Initialize | WorkerCommand::Ping => {
                    events.send(self.announcement()).await?;
                }
                WorkerCommand::RunOcrJob {
                    job_id,
                    image,
                    mode,
                } => {
                    if !self.readiness.is_ready() {
                        tracing::warn!("[SANDBOX] Job {} rejected, engine not ready", job_id);
                        events
                            .send(WorkerEvent::JobResult {
                                job_id,
                                outcome: JobOutcome::Failed(WorkerFault::NotInitialized),
                            })
                            .await?;
                        continue;
                    }

                    let loader = self.loader.clone();
                    let core = self.core;
                    let events = events.clone();
                    tokio::spawn(async move {
                        let event = run_job(loader.as_ref(), core, job_id, &image, mode).await;
                        if let Err(e) = events.send(event).await {
                            tracing::warn!("[SANDBOX] Dropped result of job {}: {}", job_id, e);
                        }
                    });
                }
                WorkerCommand::Unknown => {
                    tracing::debug!("[SANDBOX] Ignoring unknown command");
                }
            }
        }
    }
}

/// Probes the accelerated core, then the baseline core at most once.
/// Returns the core that jobs should use.
async fn bring_up(loader: Arc<dyn EngineLoader>) -> (EngineCore, anyhow::Result<()>) {
    match probe(loader.as_ref(), EngineCore::Accelerated).await {
        Ok(()) => (EngineCore::Accelerated, Ok(())),
        Err(e) => {
            tracing::warn!("[SANDBOX] Accelerated core failed ({e:#}), falling back to baseline");
            (
                EngineCore::Baseline,
                probe(loader.as_ref(), EngineCore::Baseline).await,
            )
        }
    }
}

async fn probe(loader: &dyn EngineLoader, core: EngineCore) -> anyhow::Result<()> {
    let engine = loader.spawn(core).await?;
    engine.terminate().await
}

async fn run_job(
    loader: &dyn EngineLoader,
    core: EngineCore,
    job_id: Uuid,
    image: &str,
    mode: SegmentationMode,
) -> WorkerEvent {
    tracing::debug!("[SANDBOX] Job {} started (psm {})", job_id, mode.psm());

    let outcome = match recognize(loader, core, image, mode).await {
        Ok(text) => JobOutcome::Text(text),
        Err(e) => {
            tracing::warn!("[SANDBOX] Job {} failed: {e:#}", job_id);
            JobOutcome::Failed(WorkerFault::Engine(format!("{e:#}")))
        }
    };
    WorkerEvent::JobResult { job_id, outcome }
}

/// Fresh engine per job, terminated whatever the outcome
async fn recognize(
    loader: &dyn EngineLoader,
    core: EngineCore,
    image: &str,
    mode: SegmentationMode,
) -> anyhow::Result<String> {
    let png = decode_data_url(image).context("Unreadable job image")?;

    let mut engine = loader.spawn(core).await?;
    let text = engine.recognize(&png, mode).await;
    if let Err(e) = engine.terminate().await {
        tracing::warn!("[SANDBOX] Engine teardown failed: {e:#}");
    }
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;
    use crate::engine::EngineInstance;

    const IMAGE: &str = "data:image/png;base64,AAAA";

    #[derive(Default)]
    struct FakeLoader {
        spawn_delay: Duration,
        accelerated_failures: Mutex<usize>,
        baseline_broken: bool,
        spawns: Mutex<Vec<EngineCore>>,
        modes: Arc<Mutex<Vec<SegmentationMode>>>,
    }

    impl FakeLoader {
        fn spawns(&self, core: EngineCore) -> usize {
            self.spawns.lock().unwrap().iter().filter(|c| **c == core).count()
        }
    }

    struct FakeInstance {
        core: EngineCore,
        modes: Arc<Mutex<Vec<SegmentationMode>>>,
    }

    #[async_trait]
    impl EngineLoader for FakeLoader {
        async fn spawn(&self, core: EngineCore) -> anyhow::Result<Box<dyn EngineInstance>> {
            if !self.spawn_delay.is_zero() {
                tokio::time::sleep(self.spawn_delay).await;
            }
            self.spawns.lock().unwrap().push(core);
            match core {
                EngineCore::Accelerated => {
                    let mut failures = self.accelerated_failures.lock().unwrap();
                    if *failures > 0 {
                        *failures -= 1;
                        anyhow::bail!("no SIMD support");
                    }
                }
                EngineCore::Baseline if self.baseline_broken => anyhow::bail!("core missing"),
                EngineCore::Baseline => {}
            }
            Ok(Box::new(FakeInstance {
                core,
                modes: self.modes.clone(),
            }))
        }
    }

    #[async_trait]
    impl EngineInstance for FakeInstance {
        async fn recognize(
            &mut self,
            _png: &[u8],
            mode: SegmentationMode,
        ) -> anyhow::Result<String> {
            self.modes.lock().unwrap().push(mode);
            Ok(format!("text via {:?}", self.core))
        }

        async fn terminate(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Harness {
        commands: AsyncSender<WorkerCommand>,
        events: AsyncReceiver<WorkerEvent>,
        cancel: CancellationToken,
    }

    impl Harness {
        fn start(loader: Arc<FakeLoader>) -> Self {
            let (commands, command_rx) = kanal::unbounded_async();
            let (event_tx, events) = kanal::unbounded_async();
            let cancel = CancellationToken::new();
            tokio::spawn(SandboxWorker::new(loader).run(command_rx, event_tx, cancel.clone()));
            Self {
                commands,
                events,
                cancel,
            }
        }

        async fn next(&self) -> WorkerEvent {
            timeout(Duration::from_secs(1), self.events.recv())
                .await
                .unwrap()
                .unwrap()
        }

        async fn job(&self, mode: SegmentationMode) -> JobOutcome {
            let job_id = Uuid::new_v4();
            self.commands
                .send(WorkerCommand::RunOcrJob {
                    job_id,
                    image: IMAGE.into(),
                    mode,
                })
                .await
                .unwrap();
            match self.next().await {
                WorkerEvent::JobResult { job_id: id, outcome } => {
                    assert_eq!(id, job_id);
                    outcome
                }
                other => panic!("expected a job result, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_fallback_once_then_ready() {
        let loader = Arc::new(FakeLoader {
            accelerated_failures: Mutex::new(1),
            ..FakeLoader::default()
        });
        let harness = Harness::start(loader.clone());

        assert_eq!(harness.next().await, WorkerEvent::Ready { error: None });
        assert_eq!(loader.spawns(EngineCore::Accelerated), 1);
        assert_eq!(loader.spawns(EngineCore::Baseline), 1);

        let outcome = harness.job(SegmentationMode::default()).await;
        assert_eq!(outcome, JobOutcome::Text("text via Baseline".into()));

        // one probe plus one job, nothing re-initialised
        assert_eq!(loader.spawns(EngineCore::Accelerated), 1);
        assert_eq!(loader.spawns(EngineCore::Baseline), 2);
        assert_eq!(*loader.modes.lock().unwrap(), vec![SegmentationMode::SingleLine]);

        harness.cancel.cancel();
    }

    #[tokio::test]
    async fn test_both_cores_fail() {
        let loader = Arc::new(FakeLoader {
            accelerated_failures: Mutex::new(usize::MAX),
            baseline_broken: true,
            ..FakeLoader::default()
        });
        let harness = Harness::start(loader.clone());

        match harness.next().await {
            WorkerEvent::Ready { error: Some(error) } => assert!(error.contains("core missing")),
            other => panic!("expected a failed announcement, got {other:?}"),
        }

        let outcome = harness.job(SegmentationMode::Auto).await;
        assert_eq!(outcome, JobOutcome::Failed(WorkerFault::NotInitialized));

        // neither the job nor a second Initialize retries
        harness.commands.send(WorkerCommand::Initialize).await.unwrap();
        assert!(matches!(
            harness.next().await,
            WorkerEvent::Ready { error: Some(_) }
        ));
        assert_eq!(loader.spawns(EngineCore::Accelerated), 1);
        assert_eq!(loader.spawns(EngineCore::Baseline), 1);
    }

    #[tokio::test]
    async fn test_ping_reports_without_reinitializing() {
        let loader = Arc::new(FakeLoader::default());
        let harness = Harness::start(loader.clone());
        assert_eq!(harness.next().await, WorkerEvent::Ready { error: None });

        for _ in 0..3 {
            harness.commands.send(WorkerCommand::Ping).await.unwrap();
            assert_eq!(harness.next().await, WorkerEvent::Ready { error: None });
        }
        assert_eq!(loader.spawns(EngineCore::Accelerated), 1);
        assert_eq!(loader.spawns(EngineCore::Baseline), 0);
    }

    #[tokio::test]
    async fn test_each_job_gets_its_own_instance() {
        let loader = Arc::new(FakeLoader::default());
        let harness = Harness::start(loader.clone());
        harness.next().await;

        harness.job(SegmentationMode::SingleLine).await;
        harness.job(SegmentationMode::SingleBlock).await;
        assert_eq!(loader.spawns(EngineCore::Accelerated), 3);
    }

    #[tokio::test]
    async fn test_bad_image_fails_the_job_only() {
        let loader = Arc::new(FakeLoader::default());
        let harness = Harness::start(loader.clone());
        harness.next().await;

        harness
            .commands
            .send(WorkerCommand::RunOcrJob {
                job_id: Uuid::new_v4(),
                image: "https://example.com/a.png".into(),
                mode: SegmentationMode::default(),
            })
            .await
            .unwrap();
        assert!(matches!(
            harness.next().await,
            WorkerEvent::JobResult {
                outcome: JobOutcome::Failed(WorkerFault::Engine(_)),
                ..
            }
        ));

        assert!(matches!(
            harness.job(SegmentationMode::default()).await,
            JobOutcome::Text(_)
        ));
    }

    #[tokio::test]
    async fn test_commands_answered_while_initializing() {
        let loader = Arc::new(FakeLoader {
            spawn_delay: Duration::from_millis(300),
            ..FakeLoader::default()
        });
        let harness = Harness::start(loader.clone());

        harness.commands.send(WorkerCommand::Ping).await.unwrap();
        assert_eq!(
            harness.next().await,
            WorkerEvent::Ready {
                error: Some("not-initialized".into())
            }
        );

        // fails straight away instead of waiting for the engine
        let outcome = harness.job(SegmentationMode::default()).await;
        assert_eq!(outcome, JobOutcome::Failed(WorkerFault::NotInitialized));

        assert_eq!(harness.next().await, WorkerEvent::Ready { error: None });
        assert_eq!(loader.spawns(EngineCore::Accelerated), 1);

        let outcome = harness.job(SegmentationMode::default()).await;
        assert_eq!(outcome, JobOutcome::Text("text via Accelerated".into()));
        harness.cancel.cancel();
    }
}
