use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use kanal::AsyncReceiver;
use text2cal_capture::{FileScreenshot, Gesture, Point, png_data_url};
use text2cal_config::Config;
use text2cal_core::redact;
use text2cal_types::{CoordinatorRequest, OcrProviderId, ParserId, Reply};
use tokio::task::JoinSet;

use crate::controller::{AppController, Services};
use crate::page::review::{ReviewForm, ReviewStatus};
use crate::page::{PageEvent, PageInput};
use crate::sandbox_bridge::SandboxStatus;

/// Simulated drag, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Selection {
    /// Pointer down at the top-left corner, released at the bottom-right
    pub fn gestures(&self) -> [Gesture; 3] {
        let start = Point::new(self.x, self.y);
        let end = Point::new(self.x + self.width, self.y + self.height);
        [
            Gesture::PointerDown(start),
            Gesture::PointerMove(end),
            Gesture::PointerUp(end),
        ]
    }
}

pub fn parse_selection(value: &str) -> Result<Selection, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in rect: {e}"))?;

    match parts.as_slice() {
        &[x, y, width, height] => Ok(Selection {
            x,
            y,
            width,
            height,
        }),
        _ => Err("rect must be x,y,width,height".to_string()),
    }
}

/// Runs `work` until it finishes, Ctrl+C arrives, or a context dies
async fn supervise<F>(
    controller: &AppController,
    tasks: &mut JoinSet<anyhow::Result<()>>,
    work: F,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let result = tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            Ok(())
        }
        Some(exited) = tasks.join_next() => match exited {
            Ok(Ok(())) => Err(anyhow!("A context exited early")),
            Ok(Err(e)) => Err(e.context("A context failed")),
            Err(e) => Err(anyhow!("A context panicked: {e}")),
        },
    };

    controller.shutdown();
    while let Some(exited) = tasks.join_next().await {
        if let Ok(Err(e)) = exited {
            tracing::warn!("Context stopped with error: {e:#}");
        }
    }
    result
}

pub async fn capture(
    config: Config,
    screenshot: PathBuf,
    selection: Selection,
    scale: f64,
) -> anyhow::Result<()> {
    let controller = AppController::new(config.channel_capacity, scale);
    let services = Services::from_config(&config, Arc::new(FileScreenshot::new(screenshot)));
    let (mut tasks, bridge) = controller.spawn_tasks(services);
    tracing::debug!("Sandbox status at start: {:?}", bridge.status());

    let events = controller.page_events();
    let work = async {
        match run_capture(&controller, &events, selection).await? {
            Some(outcome) => {
                print_review(&outcome.form);
                if let Some(calendar) = outcome.calendar {
                    println!("{calendar}");
                }
            }
            None => println!("Capture cancelled"),
        }
        Ok(())
    };
    supervise(&controller, &mut tasks, work).await
}

/// Settled review plus the calendar link, or the notice explaining why
/// there is none
pub struct CaptureOutcome {
    pub form: ReviewForm,
    pub calendar: Option<String>,
}

/// Toolbar click → drag → wait for the review to settle → calendar link.
/// `None` when the selection was too small to count.
pub async fn run_capture(
    controller: &AppController,
    events: &AsyncReceiver<PageEvent>,
    selection: Selection,
) -> anyhow::Result<Option<CaptureOutcome>> {
    let ack = controller
        .coordinator()
        .request(CoordinatorRequest::BeginCapture)
        .await?;
    if !ack.is_ok() {
        bail!("Capture refused: {ack:?}");
    }

    loop {
        if let PageEvent::OverlayShown = events.recv().await? {
            break;
        }
    }

    let inputs = controller.page_input();
    for gesture in selection.gestures() {
        inputs.send(PageInput::Gesture(gesture)).await?;
    }

    let form = loop {
        match events.recv().await? {
            PageEvent::CaptureCancelled => return Ok(None),
            PageEvent::CaptureFailed(error) => bail!("Capture error: {error}"),
            PageEvent::Review(form) if form.status() != ReviewStatus::Processing => break form,
            _ => {}
        }
    };

    if form.status() != ReviewStatus::Ready {
        return Ok(Some(CaptureOutcome {
            form,
            calendar: None,
        }));
    }

    inputs.send(PageInput::AddToCalendar).await?;
    let calendar = loop {
        match events.recv().await? {
            PageEvent::CalendarLink(url) => break format!("Calendar link: {url}"),
            PageEvent::Notice(notice) => break notice,
            _ => {}
        }
    };

    Ok(Some(CaptureOutcome {
        form,
        calendar: Some(calendar),
    }))
}

fn print_review(form: &ReviewForm) {
    println!("Status:   {}", form.status());
    if let Some(methods) = &form.methods {
        println!("          {methods}");
    }
    println!("Title:    {}", form.title);
    println!("Location: {}", form.location);
    println!(
        "Start:    {} {}",
        display_or_dash(form.start_date),
        display_or_dash(form.start_time)
    );
    println!(
        "End:      {} {}",
        display_or_dash(form.end_date),
        display_or_dash(form.end_time)
    );
    println!("All-day:  {}", form.is_all_day());
    println!("OCR text: {:?}", form.ocr_text);
    println!("--- log ---");
    for line in form.log_lines() {
        println!("{line}");
    }
}

fn display_or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

async fn diag(config: Config, request: CoordinatorRequest) -> anyhow::Result<()> {
    let controller = AppController::new(config.channel_capacity, 1.0);
    let services = Services::from_config(&config, Arc::new(FileScreenshot::new("")));
    let (mut tasks, bridge) = controller.spawn_tasks(services);

    let work = async {
        if let CoordinatorRequest::DiagTestOcr {
            provider: OcrProviderId::Local,
            ..
        } = &request
        {
            bridge.ping().await?;
            if let SandboxStatus::Failed(reason) = bridge.announced().await {
                tracing::warn!("Local OCR engine unavailable: {}", reason);
            }
        }

        match controller.coordinator().request(request).await? {
            Reply::OcrText { text, debug, .. } => {
                println!("{text}");
                println!("--- request ---\n{}", redact::render_for_log(&debug));
            }
            Reply::Parsed { result, debug, .. } => {
                println!("{}", serde_json::to_string_pretty(&result)?);
                println!("--- request ---\n{}", redact::render_for_log(&debug));
            }
            Reply::Failure { error, debug } => {
                if let Some(debug) = debug {
                    println!("--- request ---\n{}", redact::render_for_log(&debug));
                }
                bail!("{error}")
            }
            other => bail!("Unexpected reply: {}", other.kind()),
        }
        Ok(())
    };
    supervise(&controller, &mut tasks, work).await
}

pub async fn diag_ocr(config: Config, provider: OcrProviderId, image: String) -> anyhow::Result<()> {
    let image = if image.starts_with("http://") || image.starts_with("https://") {
        image
    } else {
        let bytes = tokio::fs::read(&image)
            .await
            .with_context(|| format!("Failed to read {image}"))?;
        png_data_url(&bytes)
    };

    diag(config, CoordinatorRequest::DiagTestOcr { provider, image }).await
}

pub async fn diag_parse(config: Config, provider: ParserId, text: String) -> anyhow::Result<()> {
    diag(config, CoordinatorRequest::DiagTestParse { provider, text }).await
}
