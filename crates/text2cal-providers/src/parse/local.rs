use async_trait::async_trait;
use text2cal_config::ApiKeys;
use text2cal_types::{DebugTrace, EventDetails, ParserId};

use crate::{ParseInput, ParseProvider, ProviderError, ProviderOutput};

/// Placeholder title so the form shows that no real parsing happened
pub const LOCAL_TITLE: &str = "(local parse)";

/// Network-free fallback. Needs no credentials and never fails, which keeps
/// the pipeline usable with an empty settings store.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalParser;

#[async_trait]
impl ParseProvider for LocalParser {
    fn id(&self) -> ParserId {
        ParserId::Local
    }

    async fn run(
        &self,
        _input: &ParseInput,
        _keys: &ApiKeys,
    ) -> Result<ProviderOutput<EventDetails>, ProviderError> {
        Ok(ProviderOutput {
            result: EventDetails {
                title: Some(LOCAL_TITLE.to_string()),
                start: None,
                end: None,
                location: None,
                has_time: Some(false),
            },
            trace: DebugTrace::local(self.id().as_str()),
        })
    }
}
