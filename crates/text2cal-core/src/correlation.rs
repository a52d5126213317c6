use std::collections::HashMap;
use std::fmt;

use text2cal_types::RequestId;

use crate::error::PipelineError;

/// Kind of provider call; each keeps its own latest token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Ocr,
    Parse,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Ocr => f.write_str("OCR"),
            Slot::Parse => f.write_str("parse"),
        }
    }
}

/// Latest correlation token per slot. Only a reply carrying the most
/// recently issued token may touch visible state.
#[derive(Debug, Default)]
pub struct RequestSlots {
    latest: HashMap<Slot, RequestId>,
}

impl RequestSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh token; earlier tokens for `slot` become stale
    pub fn issue(&mut self, slot: Slot) -> RequestId {
        let id = RequestId::fresh();
        self.latest.insert(slot, id);
        id
    }

    pub fn latest(&self, slot: Slot) -> Option<RequestId> {
        self.latest.get(&slot).copied()
    }

    pub fn accept(&self, slot: Slot, received: RequestId) -> Result<(), PipelineError> {
        if self.latest(slot) == Some(received) {
            Ok(())
        } else {
            Err(PipelineError::StaleResponse { slot, received })
        }
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }
}
