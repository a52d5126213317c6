//! Editable review form shown after a capture.
//!
//! The form is a leaf: it only ever receives results, it never calls a
//! provider. A failure flips the status line and appends to the log but
//! leaves whatever the user already typed.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use text2cal_core::redact;
use text2cal_types::{DebugTrace, EventDetails};

use super::calendar::{self, CalendarLinkError};

/// Oldest log lines are dropped past this
const LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Processing => f.write_str("Processing…"),
            ReviewStatus::Ready => f.write_str("Ready - review and edit as needed"),
            ReviewStatus::Failed => f.write_str("Processing failed - check log for details"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct ReviewForm {
    pub title: String,
    pub location: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub ocr_text: String,
    /// Cropped region as a PNG data URL
    pub image: String,
    /// `OCR: x • Parse: y`, once settings are known
    pub methods: Option<String>,
    all_day: bool,
    status: ReviewStatus,
    log: VecDeque<String>,
}

impl fmt::Debug for ReviewForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewForm")
            .field("title", &self.title)
            .field("location", &self.location)
            .field("start_date", &self.start_date)
            .field("start_time", &self.start_time)
            .field("end_date", &self.end_date)
            .field("end_time", &self.end_time)
            .field("all_day", &self.all_day)
            .field("status", &self.status)
            .field("ocr_chars", &self.ocr_text.len())
            .field("log_lines", &self.log.len())
            .finish()
    }
}

impl ReviewForm {
    /// Blank form for a fresh capture
    pub fn open(image: String) -> Self {
        let mut form = Self {
            title: String::new(),
            location: String::new(),
            start_date: None,
            start_time: None,
            end_date: None,
            end_time: None,
            ocr_text: String::new(),
            image,
            methods: None,
            all_day: false,
            status: ReviewStatus::Processing,
            log: VecDeque::new(),
        };
        form.log("=== PROCESSING START ===");
        form
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        let stamp = Local::now().format("%H:%M:%S");
        self.log.push_back(format!("[{stamp}] {}", message.as_ref()));
    }

    /// Only ever writes the sanitized rendering
    pub fn log_trace(&mut self, label: &str, trace: &DebugTrace) {
        let rendered = redact::render_for_log(trace);
        self.log(format!("{label} request: {rendered}"));
    }

    pub fn set_methods(&mut self, ocr: &str, parse: &str) {
        self.log(format!("Selected OCR method: {ocr}"));
        self.log(format!("Selected parsing method: {parse}"));
        self.methods = Some(format!("OCR: {ocr} • Parse: {parse}"));
    }

    pub fn set_ocr_text(&mut self, provider: &str, text: String) {
        self.log(format!(
            "OCR completed using {provider}. Extracted {} characters",
            text.chars().count()
        ));
        self.log(format!("OCR text: {text:?}"));
        self.ocr_text = text;
    }

    /// Fills the fields from a parse result. `hasTime: false` wins over any
    /// time-of-day carried by start/end.
    pub fn apply_event(&mut self, event: &EventDetails) {
        self.title = event.title.clone().unwrap_or_default();
        self.location = event.location.clone().unwrap_or_default();

        if let Some((date, time)) = event.start.as_deref().and_then(parse_local) {
            self.start_date = Some(date);
            self.start_time = time;
        }
        if let Some((date, time)) = event.end.as_deref().and_then(parse_local) {
            self.end_date = Some(date);
            self.end_time = time;
        }

        self.set_all_day(event.is_all_day());
        self.log(format!(
            "Final result: title={:?}, hasTime={:?}, location={:?}",
            event.title, event.has_time, event.location
        ));
    }

    /// Turning all-day on clears both times
    pub fn set_all_day(&mut self, all_day: bool) {
        self.all_day = all_day;
        if all_day {
            self.start_time = None;
            self.end_time = None;
        }
    }

    pub fn complete(&mut self) {
        self.log("=== PROCESSING COMPLETE ===");
        self.status = ReviewStatus::Ready;
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        self.log("=== PROCESSING ERROR ===");
        self.log(format!("Error: {error}"));
        self.status = ReviewStatus::Failed;
    }

    pub fn calendar_url(&self) -> Result<String, CalendarLinkError> {
        calendar::template_url(self)
    }
}

/// Date plus optional minute-precision time from a parser timestamp.
/// Offsets are converted to local time; a bare date carries no time.
fn parse_local(value: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let value = value.trim();

    let datetime = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local).naive_local())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        });

    if let Some(datetime) = datetime {
        let time = NaiveTime::from_hms_opt(datetime.hour(), datetime.minute(), 0);
        return Some((datetime.date(), time));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| (date, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_timed_event_fills_dates_and_times() {
        let mut form = ReviewForm::open("data:image/png;base64,AA".into());
        form.apply_event(&EventDetails {
            title: Some("Standup".into()),
            start: Some("2025-03-14T09:30:45".into()),
            end: Some("2025-03-14T10:00:00".into()),
            location: Some("Room 4".into()),
            has_time: Some(true),
        });

        assert_eq!(form.title, "Standup");
        assert_eq!(form.location, "Room 4");
        assert_eq!(form.start_date, ymd(2025, 3, 14));
        assert_eq!(form.start_time, hm(9, 30));
        assert_eq!(form.end_time, hm(10, 0));
        assert!(!form.is_all_day());
    }

    #[test]
    fn test_has_time_false_renders_all_day() {
        let mut form = ReviewForm::open(String::new());
        form.apply_event(&EventDetails {
            title: Some("Offsite".into()),
            start: Some("2025-06-02T09:00:00".into()),
            end: Some("2025-06-03T17:00:00".into()),
            location: None,
            has_time: Some(false),
        });

        assert!(form.is_all_day());
        assert_eq!(form.start_date, ymd(2025, 6, 2));
        assert_eq!(form.end_date, ymd(2025, 6, 3));
        assert_eq!(form.start_time, None);
        assert_eq!(form.end_time, None);
    }

    #[test]
    fn test_missing_flag_is_timed() {
        let mut form = ReviewForm::open(String::new());
        form.apply_event(&EventDetails {
            start: Some("2025-06-02".into()),
            ..EventDetails::default()
        });
        assert!(!form.is_all_day());
        assert_eq!(form.start_date, ymd(2025, 6, 2));
        assert_eq!(form.start_time, None);
    }

    #[test]
    fn test_failure_keeps_typed_fields() {
        let mut form = ReviewForm::open(String::new());
        form.title = "typed by hand".into();
        form.fail("Gemini API key is missing.");

        assert_eq!(form.status(), ReviewStatus::Failed);
        assert_eq!(form.title, "typed by hand");
        assert!(form.log_lines().any(|l| l.ends_with("Error: Gemini API key is missing.")));
        assert_eq!(
            form.status().to_string(),
            "Processing failed - check log for details"
        );
    }

    #[test]
    fn test_log_lines_are_timestamped_and_capped() {
        let mut form = ReviewForm::open(String::new());
        for i in 0..LOG_CAPACITY + 10 {
            form.log(format!("line {i}"));
        }
        assert_eq!(form.log_lines().count(), LOG_CAPACITY);

        let last = form.log_lines().last().unwrap();
        assert!(last.starts_with('['));
        assert!(last.ends_with(&format!("] line {}", LOG_CAPACITY + 9)));
    }

    #[test]
    fn test_trace_never_logs_inline_images() {
        let mut form = ReviewForm::open(String::new());
        let trace = DebugTrace::request(
            "openai-vision",
            Some("gpt-4o-mini"),
            "https://api.openai.com/v1/chat/completions",
            serde_json::json!({
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Extract text"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0KGgo"}}
                    ]
                }]
            }),
        );
        form.log_trace("OCR", &trace);

        let line = form.log_lines().last().unwrap();
        assert!(line.contains("OCR request:"));
        assert!(!line.contains("iVBORw0KGgo"));
    }
}
