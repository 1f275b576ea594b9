use uuid::Uuid;

use super::{content_metadata, ContentProcessor};
use crate::models::content::Content;
use crate::models::event::{Part, RawEvent};

/// Emits one `message` item for every non-empty text part of an event
#[derive(Debug, Clone, Copy, Default)]
pub struct TextContentProcessor;

impl TextContentProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentProcessor for TextContentProcessor {
    fn name(&self) -> &str {
        "text"
    }

    fn process_event(&self, event: &RawEvent, session_id: Uuid, turn_id: Uuid) -> Vec<Content> {
        event
            .parts()
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) if !text.is_empty() => Some(
                    Content::message(turn_id, text.as_str())
                        .with_metadata(content_metadata(event, session_id)),
                ),
                _ => None,
            })
            .collect()
    }
}
