use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::content::Content;
use crate::models::event::RawEvent;

mod text;
mod tool_call;

pub use text::TextContentProcessor;
pub use tool_call::ToolCallProcessor;

/// Core trait for turning one engine event into client content
///
/// Implementations are shared by every concurrent run, so they must not keep any
/// per-call state. Several processors run over the same event and their outputs are
/// concatenated, so a processor only emits what it is responsible for and returns an
/// empty list when the event holds nothing relevant to it.
pub trait ContentProcessor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Convert the event into zero or more content items. `turn_id` is the id every
    /// item of the current user turn shares.
    fn process_event(&self, event: &RawEvent, session_id: Uuid, turn_id: Uuid) -> Vec<Content>;
}

/// Annotations attached to every item the built-in processors produce
pub(crate) fn content_metadata(event: &RawEvent, session_id: Uuid) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "session_id".to_string(),
        Value::String(session_id.to_string()),
    );
    metadata.insert(
        "agent".to_string(),
        Value::String(event.author_or_unknown().to_string()),
    );
    metadata
}
