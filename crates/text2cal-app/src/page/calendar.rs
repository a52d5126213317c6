//! Google Calendar "create event" link built from the review form.

use chrono::{NaiveDate, NaiveTime};

use super::review::ReviewForm;

pub const CALENDAR_BASE: &str = "https://calendar.google.com/calendar/render?action=TEMPLATE";

const DEFAULT_TITLE: &str = "New Event";
const DETAILS: &str = "Created by Text2Cal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalendarLinkError {
    #[error("Please set a start date for an all-day event")]
    MissingStartDate,

    #[error("Please set start time, end date, and end time, or check \"All-day\"")]
    MissingStartTime,

    #[error("Date is out of range")]
    DateOutOfRange,
}

pub fn template_url(form: &ReviewForm) -> Result<String, CalendarLinkError> {
    let title = if form.title.is_empty() {
        DEFAULT_TITLE
    } else {
        form.title.as_str()
    };

    let dates = if form.is_all_day() {
        all_day_range(form.start_date, form.end_date)?
    } else {
        timed_range(form.start_date, form.start_time, form.end_date, form.end_time)?
    };

    Ok(format!(
        "{CALENDAR_BASE}&text={}&location={}&details={}&dates={dates}",
        urlencoding::encode(title),
        urlencoding::encode(&form.location),
        urlencoding::encode(DETAILS),
    ))
}

/// End date is exclusive, so the last day is pushed one forward
fn all_day_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<String, CalendarLinkError> {
    let start = start.ok_or(CalendarLinkError::MissingStartDate)?;
    let end = end
        .unwrap_or(start)
        .succ_opt()
        .ok_or(CalendarLinkError::DateOutOfRange)?;

    Ok(format!("{}/{}", start.format("%Y%m%d"), end.format("%Y%m%d")))
}

fn timed_range(
    start_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_date: Option<NaiveDate>,
    end_time: Option<NaiveTime>,
) -> Result<String, CalendarLinkError> {
    let (Some(start_date), Some(start_time)) = (start_date, start_time) else {
        return Err(CalendarLinkError::MissingStartTime);
    };
    let end_date = end_date.unwrap_or(start_date);
    let end_time = end_time.unwrap_or(start_time);

    Ok(format!(
        "{}T{}00/{}T{}00",
        start_date.format("%Y%m%d"),
        start_time.format("%H%M"),
        end_date.format("%Y%m%d"),
        end_time.format("%H%M"),
    ))
}
