//! Page context driven by hand: replies are injected directly so their
//! order is fully controlled

use kanal::{AsyncReceiver, unbounded_async};
use text2cal_capture::{CapturedImage, encode_png};
use text2cal_core::{Mailbox, PipelineError, Slot, channel};
use text2cal_types::{CoordinatorRequest, DebugTrace, EventDetails, Reply, RequestId};

use crate::page::review::ReviewStatus;
use crate::page::{PageContext, PageEvent, PageInput};

/// Page with a coordinator nobody answers. The returned handles must stay
/// alive for the duration of the test.
async fn open_page() -> (
    PageContext,
    Mailbox<CoordinatorRequest, Reply>,
    AsyncReceiver<PageInput>,
    AsyncReceiver<PageEvent>,
) {
    let (coordinator, mailbox) = channel("coordinator", 16);
    let (input_tx, input_rx) = unbounded_async();
    let (event_tx, event_rx) = unbounded_async();
    let mut page = PageContext::new(coordinator, input_tx, event_tx, 1.0);

    let png = encode_png(&image::RgbaImage::new(12, 12)).unwrap();
    page.handle_input(PageInput::Cropped(Ok(CapturedImage {
        png,
        width: 12,
        height: 12,
    })))
    .await;

    (page, mailbox, input_rx, event_rx)
}

fn settings() -> Result<Reply, PipelineError> {
    Ok(Reply::Settings {
        ocr_method: "local".into(),
        parse_method: "local".into(),
    })
}

fn ocr_text(text: &str, request_id: RequestId) -> PageInput {
    PageInput::OcrFinished {
        request_id,
        reply: Ok(Reply::OcrText {
            text: text.into(),
            debug: DebugTrace::local("local"),
            request_id: Some(request_id),
        }),
    }
}

#[tokio::test]
async fn test_older_ocr_reply_is_ignored() {
    let (mut page, _mailbox, _inputs, _events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(settings())).await;
    let t1 = page.latest_token(Slot::Ocr).unwrap();
    page.handle_input(PageInput::SettingsLoaded(settings())).await;
    let t2 = page.latest_token(Slot::Ocr).unwrap();
    assert_ne!(t1, t2);

    page.handle_input(ocr_text("stale", t1)).await;
    assert_eq!(page.review().unwrap().ocr_text, "");
    assert!(page.latest_token(Slot::Parse).is_none());

    page.handle_input(ocr_text("fresh", t2)).await;
    assert_eq!(page.review().unwrap().ocr_text, "fresh");
    assert!(page.latest_token(Slot::Parse).is_some());

    // a late copy of the first reply still changes nothing
    page.handle_input(ocr_text("stale", t1)).await;
    assert_eq!(page.review().unwrap().ocr_text, "fresh");
}

#[tokio::test]
async fn test_stale_failure_does_not_fail_the_form() {
    let (mut page, _mailbox, _inputs, _events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(settings())).await;
    let t1 = page.latest_token(Slot::Ocr).unwrap();
    page.handle_input(PageInput::SettingsLoaded(settings())).await;

    page.handle_input(PageInput::OcrFinished {
        request_id: t1,
        reply: Err(PipelineError::Remote("Claude API key is missing.".into())),
    })
    .await;
    assert_eq!(page.review().unwrap().status(), ReviewStatus::Processing);
}

#[tokio::test]
async fn test_only_latest_parse_reply_completes_the_form() {
    let (mut page, _mailbox, _inputs, _events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(settings())).await;
    let ocr = page.latest_token(Slot::Ocr).unwrap();
    page.handle_input(ocr_text("Demo Fri", ocr)).await;
    let parse = page.latest_token(Slot::Parse).unwrap();

    let parsed = |request_id: RequestId, title: &str| PageInput::ParseFinished {
        request_id,
        reply: Ok(Reply::Parsed {
            result: EventDetails {
                title: Some(title.into()),
                ..EventDetails::default()
            },
            debug: DebugTrace::local("local"),
            request_id: Some(request_id),
        }),
    };

    page.handle_input(parsed(RequestId::fresh(), "Wrong")).await;
    assert_eq!(page.review().unwrap().title, "");
    assert_eq!(page.review().unwrap().status(), ReviewStatus::Processing);

    page.handle_input(parsed(parse, "Demo")).await;
    assert_eq!(page.review().unwrap().title, "Demo");
    assert_eq!(page.review().unwrap().status(), ReviewStatus::Ready);
}

#[tokio::test]
async fn test_replies_after_close_are_dropped() {
    let (mut page, _mailbox, _inputs, events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(settings())).await;
    let t1 = page.latest_token(Slot::Ocr).unwrap();
    page.handle_input(PageInput::Close).await;

    page.handle_input(ocr_text("late", t1)).await;
    assert!(page.review().is_none());
    assert!(page.latest_token(Slot::Parse).is_none());

    let mut closed = false;
    while let Ok(Some(event)) = events.try_recv() {
        closed |= matches!(event, PageEvent::ReviewClosed);
    }
    assert!(closed);
}

#[tokio::test]
async fn test_unknown_method_fails_form() {
    let (mut page, _mailbox, _inputs, _events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(Ok(Reply::Settings {
        ocr_method: "paddle".into(),
        parse_method: "local".into(),
    })))
    .await;

    let form = page.review().unwrap();
    assert_eq!(form.status(), ReviewStatus::Failed);
    assert!(form.log_lines().any(|l| l.ends_with("Unknown OCR provider: paddle")));
    assert!(page.latest_token(Slot::Ocr).is_none());
}

#[tokio::test]
async fn test_settings_failure_falls_back_to_local() {
    let (mut page, _mailbox, _inputs, _events) = open_page().await;

    page.handle_input(PageInput::SettingsLoaded(Err(PipelineError::Remote(
        "store offline".into(),
    ))))
    .await;

    let form = page.review().unwrap();
    assert_eq!(form.methods.as_deref(), Some("OCR: local • Parse: local"));
    assert!(page.latest_token(Slot::Ocr).is_some());
}
