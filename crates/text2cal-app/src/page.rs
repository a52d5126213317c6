//! Per-page context: selection overlay, crop, and the review form.
//!
//! Talks to the coordinator only through its [`CoordinatorPort`]. Every
//! coordinator call runs on its own task and comes back as a
//! [`PageInput`], so the loop stays responsive while a provider is busy.

use kanal::{AsyncReceiver, AsyncSender};
use text2cal_capture::{CaptureSession, CapturedImage, Gesture, SessionUpdate};
use text2cal_core::{Dispatch, Envelope, Mailbox, PipelineError, RequestSlots, Slot};
use text2cal_types::{CaptureRect, OcrProviderId, PageMessage, ParserId, Reply, RequestId};
use tokio_util::sync::CancellationToken;

pub mod calendar;
pub mod pipeline;
pub mod review;

use review::ReviewForm;

use crate::coordinator::CoordinatorPort;

/// User actions plus results of coordinator calls made by this page
#[derive(Debug)]
pub enum PageInput {
    Gesture(Gesture),
    RedrawClicked,
    SetAllDay(bool),
    AddToCalendar,
    Close,
    Cropped(Result<CapturedImage, PipelineError>),
    SettingsLoaded(Result<Reply, PipelineError>),
    OcrFinished {
        request_id: RequestId,
        reply: Result<Reply, PipelineError>,
    },
    ParseFinished {
        request_id: RequestId,
        reply: Result<Reply, PipelineError>,
    },
}

/// What the page renders
#[derive(Debug, Clone)]
pub enum PageEvent {
    OverlayShown,
    Selecting(CaptureRect),
    CaptureCancelled,
    CaptureFailed(String),
    Review(ReviewForm),
    ReviewClosed,
    CalendarLink(String),
    Notice(String),
}

pub struct PageContext {
    coordinator: CoordinatorPort,
    inputs: AsyncSender<PageInput>,
    events: AsyncSender<PageEvent>,
    session: CaptureSession,
    review: Option<ReviewForm>,
    slots: RequestSlots,
    providers: Option<(OcrProviderId, ParserId)>,
}

impl PageContext {
    pub fn new(
        coordinator: CoordinatorPort,
        inputs: AsyncSender<PageInput>,
        events: AsyncSender<PageEvent>,
        device_scale: f64,
    ) -> Self {
        Self {
            coordinator,
            inputs,
            events,
            session: CaptureSession::new(device_scale),
            review: None,
            slots: RequestSlots::new(),
            providers: None,
        }
    }

    #[cfg(test)]
    pub fn review(&self) -> Option<&ReviewForm> {
        self.review.as_ref()
    }

    #[cfg(test)]
    pub fn latest_token(&self, slot: Slot) -> Option<RequestId> {
        self.slots.latest(slot)
    }

    async fn emit(&self, event: PageEvent) {
        if let Err(e) = self.events.send(event).await {
            tracing::debug!("[PAGE] No renderer attached: {}", e);
        }
    }

    async fn publish_review(&self) {
        if let Some(form) = &self.review {
            self.emit(PageEvent::Review(form.clone())).await;
        }
    }

    pub async fn handle_message(&mut self, envelope: Envelope<PageMessage, Reply>) -> Dispatch {
        let Envelope {
            message,
            responder,
        } = envelope;

        match message {
            PageMessage::Ping => {
                responder.respond(Reply::Ack);
                Dispatch::Replied
            }
            PageMessage::BeginCapture | PageMessage::Redraw => {
                responder.respond(Reply::Ack);
                if self.session.begin() {
                    tracing::debug!("[PAGE] Overlay shown");
                    self.emit(PageEvent::OverlayShown).await;
                }
                Dispatch::Replied
            }
            PageMessage::Unknown => {
                tracing::debug!("[PAGE] Unhandled message");
                Dispatch::Unhandled
            }
        }
    }

    pub async fn handle_input(&mut self, input: PageInput) {
        match input {
            PageInput::Gesture(gesture) => self.on_gesture(gesture).await,
            PageInput::RedrawClicked => {
                tokio::spawn(pipeline::request_redraw(self.coordinator.clone()));
            }
            PageInput::SetAllDay(all_day) => {
                if let Some(form) = self.review.as_mut() {
                    form.set_all_day(all_day);
                }
                self.publish_review().await;
            }
            PageInput::AddToCalendar => {
                let Some(form) = &self.review else {
                    tracing::debug!("[PAGE] No review open");
                    return;
                };
                match form.calendar_url() {
                    Ok(url) => self.emit(PageEvent::CalendarLink(url)).await,
                    Err(e) => self.emit(PageEvent::Notice(e.to_string())).await,
                }
            }
            PageInput::Close => {
                self.review = None;
                self.slots.clear();
                self.emit(PageEvent::ReviewClosed).await;
            }
            PageInput::Cropped(result) => self.on_cropped(result).await,
            PageInput::SettingsLoaded(result) => self.on_settings(result).await,
            PageInput::OcrFinished { request_id, reply } => {
                self.on_ocr_finished(request_id, reply).await
            }
            PageInput::ParseFinished { request_id, reply } => {
                self.on_parse_finished(request_id, reply).await
            }
        }
    }

    async fn on_gesture(&mut self, gesture: Gesture) {
        match self.session.handle(gesture) {
            SessionUpdate::Idle => {}
            SessionUpdate::Selecting(rect) => self.emit(PageEvent::Selecting(rect)).await,
            SessionUpdate::Cancelled => self.emit(PageEvent::CaptureCancelled).await,
            SessionUpdate::Completed(rect) => {
                tracing::info!(
                    "[PAGE] Selected {}x{} at ({}, {}), scale {}",
                    rect.width,
                    rect.height,
                    rect.x,
                    rect.y,
                    rect.device_scale
                );
                tokio::spawn(pipeline::capture_region(
                    self.coordinator.clone(),
                    rect,
                    self.inputs.clone(),
                ));
            }
        }
    }

    async fn on_cropped(&mut self, result: Result<CapturedImage, PipelineError>) {
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("[PAGE] Capture error: {}", e);
                self.emit(PageEvent::CaptureFailed(e.to_string())).await;
                return;
            }
        };

        tracing::debug!("[PAGE] Cropped {}x{}", image.width, image.height);
        self.slots.clear();
        self.providers = None;
        self.review = Some(ReviewForm::open(image.to_data_url()));
        self.publish_review().await;

        tokio::spawn(pipeline::load_settings(
            self.coordinator.clone(),
            self.inputs.clone(),
        ));
    }

    async fn on_settings(&mut self, result: Result<Reply, PipelineError>) {
        let Some(form) = self.review.as_mut() else {
            return;
        };

        let (ocr_method, parse_method) = match result {
            Ok(Reply::Settings {
                ocr_method,
                parse_method,
            }) => (ocr_method, parse_method),
            Ok(other) => {
                tracing::warn!("[PAGE] Unexpected settings reply {}, using defaults", other.kind());
                default_methods()
            }
            Err(e) => {
                tracing::warn!("[PAGE] Settings unavailable, using defaults: {}", e);
                default_methods()
            }
        };
        form.set_methods(&ocr_method, &parse_method);

        let providers = ocr_method
            .parse::<OcrProviderId>()
            .and_then(|ocr| Ok((ocr, parse_method.parse::<ParserId>()?)));
        let (ocr, parser) = match providers {
            Ok(providers) => providers,
            Err(e) => {
                form.fail(e);
                self.publish_review().await;
                return;
            }
        };
        self.providers = Some((ocr, parser));

        let request_id = self.slots.issue(Slot::Ocr);
        tracing::debug!("[PAGE] OCR via {} ({})", ocr, request_id);
        tokio::spawn(pipeline::run_ocr(
            self.coordinator.clone(),
            ocr,
            form.image.clone(),
            request_id,
            self.inputs.clone(),
        ));
        self.publish_review().await;
    }

    /// Token check first; a stale reply must not touch the form
    fn accept(&self, slot: Slot, sent: RequestId, reply: &Result<Reply, PipelineError>) -> bool {
        let received = reply
            .as_ref()
            .ok()
            .and_then(Reply::request_id)
            .unwrap_or(sent);
        match self.slots.accept(slot, received) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[PAGE] Dropping reply: {}", e);
                false
            }
        }
    }

    async fn on_ocr_finished(&mut self, sent: RequestId, reply: Result<Reply, PipelineError>) {
        if !self.accept(Slot::Ocr, sent, &reply) {
            return;
        }
        let (Some(form), Some((ocr, parser))) = (self.review.as_mut(), self.providers) else {
            return;
        };

        match reply {
            Ok(Reply::OcrText { text, debug, .. }) => {
                form.log_trace("OCR", &debug);
                form.set_ocr_text(ocr.as_str(), text.clone());

                let request_id = self.slots.issue(Slot::Parse);
                tracing::debug!("[PAGE] Parse via {} ({})", parser, request_id);
                tokio::spawn(pipeline::run_parse(
                    self.coordinator.clone(),
                    parser,
                    text,
                    request_id,
                    self.inputs.clone(),
                ));
            }
            Ok(Reply::Failure { error, debug }) => {
                tracing::error!("[PAGE] OCR failed: {}", error);
                if let Some(debug) = debug {
                    form.log_trace("OCR", &debug);
                }
                form.fail(error);
            }
            Ok(other) => form.fail(format!("Unexpected OCR reply: {}", other.kind())),
            Err(e) => {
                tracing::error!("[PAGE] OCR failed: {}", e);
                form.fail(e);
            }
        }
        self.publish_review().await;
    }

    async fn on_parse_finished(&mut self, sent: RequestId, reply: Result<Reply, PipelineError>) {
        if !self.accept(Slot::Parse, sent, &reply) {
            return;
        }
        let Some(form) = self.review.as_mut() else {
            return;
        };

        match reply {
            Ok(Reply::Parsed { result, debug, .. }) => {
                form.log_trace("Parse", &debug);
                form.apply_event(&result);
                form.complete();
                tracing::info!("[PAGE] Review ready (all-day: {})", form.is_all_day());
            }
            Ok(Reply::Failure { error, debug }) => {
                tracing::error!("[PAGE] Parse failed: {}", error);
                if let Some(debug) = debug {
                    form.log_trace("Parse", &debug);
                }
                form.fail(error);
            }
            Ok(other) => form.fail(format!("Unexpected parse reply: {}", other.kind())),
            Err(e) => {
                tracing::error!("[PAGE] Parse failed: {}", e);
                form.fail(e);
            }
        }
        self.publish_review().await;
    }
}

fn default_methods() -> (String, String) {
    (
        OcrProviderId::Local.as_str().to_string(),
        ParserId::Local.as_str().to_string(),
    )
}

/// Page main loop
pub async fn page_loop(
    mut page: PageContext,
    mailbox: Mailbox<PageMessage, Reply>,
    inputs: AsyncReceiver<PageInput>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[PAGE] Content context loaded");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("[PAGE] Shutting down");
                return Ok(());
            }
            envelope = mailbox.recv() => {
                let Some(envelope) = envelope else {
                    tracing::debug!("[PAGE] Coordinator port closed");
                    return Ok(());
                };
                let dispatch = page.handle_message(envelope).await;
                tracing::debug!("[PAGE] message -> {:?}", dispatch);
            }
            input = inputs.recv() => {
                page.handle_input(input?).await;
            }
        }
    }
}
