//! Selection overlay for one page.
//!
//! The page owns a single [`CaptureSession`] and feeds it pointer and
//! keyboard gestures. `begin` while an overlay is up does nothing. Once the
//! overlay is torn down (pointer released or Escape), every further gesture
//! is dropped until the next `begin`.

use text2cal_types::CaptureRect;

use crate::geometry::{Point, selection_rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Escape,
}

/// What the page should do after a gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionUpdate {
    /// Nothing to render or run
    Idle,
    /// Selection box moved; repaint it
    Selecting(CaptureRect),
    /// Overlay closed with a usable rectangle
    Completed(CaptureRect),
    /// Overlay closed without a selection
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Inactive,
    Armed,
    Dragging { start: Point },
}

#[derive(Debug)]
pub struct CaptureSession {
    phase: Phase,
    device_scale: f64,
}

impl CaptureSession {
    pub fn new(device_scale: f64) -> Self {
        Self {
            phase: Phase::Inactive,
            device_scale,
        }
    }

    /// Shows the overlay. Returns `false` if one is already up.
    pub fn begin(&mut self) -> bool {
        if self.is_active() {
            tracing::debug!("[PAGE] Overlay already active");
            return false;
        }
        self.phase = Phase::Armed;
        true
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Inactive
    }

    pub fn handle(&mut self, gesture: Gesture) -> SessionUpdate {
        match (self.phase, gesture) {
            (Phase::Inactive, _) => SessionUpdate::Idle,
            (_, Gesture::Escape) => {
                self.teardown();
                SessionUpdate::Cancelled
            }
            (Phase::Armed, Gesture::PointerDown(start)) => {
                self.phase = Phase::Dragging { start };
                SessionUpdate::Idle
            }
            (Phase::Dragging { start }, Gesture::PointerMove(current)) => {
                SessionUpdate::Selecting(self.preview(start, current))
            }
            (Phase::Dragging { start }, Gesture::PointerUp(end)) => {
                self.teardown();
                match selection_rect(start, end, self.device_scale) {
                    Some(rect) => SessionUpdate::Completed(rect),
                    None => {
                        tracing::debug!("[PAGE] Selection under threshold, capture cancelled");
                        SessionUpdate::Cancelled
                    }
                }
            }
            _ => SessionUpdate::Idle,
        }
    }

    fn teardown(&mut self) {
        self.phase = Phase::Inactive;
    }

    /// Unfiltered box for drawing; may be smaller than the threshold
    fn preview(&self, start: Point, current: Point) -> CaptureRect {
        CaptureRect {
            x: start.x.min(current.x),
            y: start.y.min(current.y),
            width: (current.x - start.x).abs(),
            height: (current.y - start.y).abs(),
            device_scale: self.device_scale,
        }
    }
}
