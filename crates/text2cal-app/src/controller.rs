use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use text2cal_capture::ScreenshotSource;
use text2cal_config::{Config, JsonFileSettings, MemorySettings, SettingsStore};
use text2cal_core::{Mailbox, channel};
use text2cal_providers::{HttpTransport, OcrRegistry, ParseRegistry, ReqwestTransport};
use text2cal_sandbox::{EngineLoader, SandboxWorker, TesseractLoader};
use text2cal_types::{CoordinatorRequest, PageMessage, Reply, WorkerCommand, WorkerEvent};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{Coordinator, CoordinatorPort, PagePort, coordinator_loop};
use crate::page::{PageContext, PageEvent, PageInput, page_loop};
use crate::sandbox_bridge::SandboxBridge;

/// Centralized channel management
pub struct ChannelSet {
    pub coordinator: (CoordinatorPort, Mailbox<CoordinatorRequest, Reply>),
    pub page: (PagePort, Mailbox<PageMessage, Reply>),
    pub page_input: (AsyncSender<PageInput>, AsyncReceiver<PageInput>),
    pub page_events: (AsyncSender<PageEvent>, AsyncReceiver<PageEvent>),
    pub sandbox_commands: (AsyncSender<WorkerCommand>, AsyncReceiver<WorkerCommand>),
    pub sandbox_events: (AsyncSender<WorkerEvent>, AsyncReceiver<WorkerEvent>),
}

impl ChannelSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            coordinator: channel("coordinator", capacity),
            page: channel("page", capacity),
            page_input: kanal::bounded_async(capacity),
            page_events: kanal::bounded_async(capacity * 4), // review updates burst
            sandbox_commands: kanal::bounded_async(capacity),
            sandbox_events: kanal::bounded_async(capacity),
        }
    }
}

/// Host-facing collaborators of the three contexts
pub struct Services {
    pub settings: Arc<dyn SettingsStore>,
    pub transport: Arc<dyn HttpTransport>,
    pub screenshots: Arc<dyn ScreenshotSource>,
    pub engine: Arc<dyn EngineLoader>,
}

impl Services {
    pub fn from_config(config: &Config, screenshots: Arc<dyn ScreenshotSource>) -> Self {
        let settings: Arc<dyn SettingsStore> = match &config.settings_path {
            Some(path) => {
                tracing::info!("Reading settings from {}", path.display());
                Arc::new(JsonFileSettings::new(path))
            }
            None => {
                tracing::info!("No settings file configured, using defaults");
                Arc::new(MemorySettings::default())
            }
        };

        Self {
            settings,
            transport: Arc::new(ReqwestTransport::new()),
            screenshots,
            engine: Arc::new(TesseractLoader::new(config.sandbox.clone())),
        }
    }
}

/// Spawns the coordinator, page and sandbox contexts and owns their lifecycle
pub struct AppController {
    channels: ChannelSet,
    device_scale: f64,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(capacity: usize, device_scale: f64) -> Self {
        Self {
            channels: ChannelSet::new(capacity),
            device_scale,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Port the toolbar / CLI uses to reach the coordinator
    pub fn coordinator(&self) -> CoordinatorPort {
        self.channels.coordinator.0.clone()
    }

    pub fn page_input(&self) -> AsyncSender<PageInput> {
        self.channels.page_input.0.clone()
    }

    pub fn page_events(&self) -> AsyncReceiver<PageEvent> {
        self.channels.page_events.1.clone()
    }

    pub fn spawn_tasks(
        &self,
        services: Services,
    ) -> (JoinSet<anyhow::Result<()>>, Arc<SandboxBridge>) {
        let mut tasks = JoinSet::new();

        // Sandbox worker
        let worker = SandboxWorker::new(services.engine);
        tasks.spawn(worker.run(
            self.channels.sandbox_commands.1.clone(),
            self.channels.sandbox_events.0.clone(),
            self.cancel_token.child_token(),
        ));

        let bridge = Arc::new(SandboxBridge::new(
            self.channels.sandbox_commands.0.clone(),
            self.channels.sandbox_events.1.clone(),
        ));

        let mut ocr = OcrRegistry::with_cloud_adapters(services.transport.clone());
        ocr.register(bridge.clone());

        // Coordinator
        let coordinator = Arc::new(Coordinator {
            settings: services.settings,
            ocr,
            parsers: ParseRegistry::with_default_adapters(services.transport),
            screenshots: services.screenshots,
            page: self.channels.page.0.clone(),
        });
        tasks.spawn(coordinator_loop(
            coordinator,
            self.channels.coordinator.1.clone(),
            self.cancel_token.child_token(),
        ));

        // Page
        let page = PageContext::new(
            self.coordinator(),
            self.page_input(),
            self.channels.page_events.0.clone(),
            self.device_scale,
        );
        tasks.spawn(page_loop(
            page,
            self.channels.page.1.clone(),
            self.channels.page_input.1.clone(),
            self.cancel_token.child_token(),
        ));

        (tasks, bridge)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
