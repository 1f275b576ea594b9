use std::collections::HashMap;

use uuid::Uuid;

use super::{content_metadata, ContentProcessor};
use crate::agents::{GET_RECIPE, GET_WEATHER};
use crate::models::content::Content;
use crate::models::event::{FunctionCall, RawEvent};

/// Tool the engine calls when an agent hands the conversation to another agent
pub const TRANSFER_TO_AGENT: &str = "transfer_to_agent";

const GENERIC_MESSAGE: &str = "Working on it...";

// Leading verb of a tool name and the progressive form shown to the user
const VERB_PREFIXES: &[(&str, &str)] = &[
    ("get_", "Getting"),
    ("fetch_", "Fetching"),
    ("search_", "Searching"),
    ("find_", "Finding"),
    ("lookup_", "Looking up"),
];

/// Emits one `loader` item for every tool invocation in an event
///
/// The loader is a progress signal sent before the tool runs, so its message is
/// derived from the tool name alone. Tools without a curated phrase get one
/// synthesized from their name.
#[derive(Debug, Clone)]
pub struct ToolCallProcessor {
    messages: HashMap<String, String>,
}

impl Default for ToolCallProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallProcessor {
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
        .with_message(GET_WEATHER, "Checking the weather...")
        .with_message(GET_RECIPE, "Looking up the recipe...")
    }

    /// Use a fixed progress message for the given tool
    pub fn with_message<N: Into<String>, M: Into<String>>(mut self, tool: N, message: M) -> Self {
        self.messages.insert(tool.into(), message.into());
        self
    }

    /// Human-readable description of what the call is doing
    pub fn describe(&self, call: &FunctionCall) -> String {
        if let Some(message) = self.messages.get(&call.name) {
            return message.clone();
        }

        if call.name == TRANSFER_TO_AGENT {
            if let Some(agent) = call.args.get("agent_name").and_then(|a| a.as_str()) {
                return format!("Asking the {}...", humanize(agent));
            }
        }

        let name = call.name.trim();
        if name.is_empty() {
            return GENERIC_MESSAGE.to_string();
        }

        for (prefix, verb) in VERB_PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                if !rest.is_empty() {
                    return format!("{} {}...", verb, humanize(rest));
                }
            }
        }

        format!("Running {}...", humanize(name))
    }
}

fn humanize(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ContentProcessor for ToolCallProcessor {
    fn name(&self) -> &str {
        "tool_call"
    }

    fn process_event(&self, event: &RawEvent, session_id: Uuid, turn_id: Uuid) -> Vec<Content> {
        event
            .function_calls()
            .map(|call| {
                Content::loader(turn_id, self.describe(call), true)
                    .with_metadata(content_metadata(event, session_id))
                    .with_metadata_entry("tool", call.name.clone().into())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventContent, Part};
    use serde_json::json;

    fn call(name: &str) -> FunctionCall {
        FunctionCall::new(name, json!({}))
    }

    #[test]
    fn test_weather_loader() {
        let turn_id = Uuid::new_v4();
        let event = RawEvent::function_call("weather_assistant", "get_weather", json!({"location": "Paris"}));

        let contents = ToolCallProcessor::new().process_event(&event, Uuid::new_v4(), turn_id);

        assert_eq!(contents.len(), 1);
        assert!(contents[0].is_loader());
        assert!(contents[0]
            .loader_message()
            .unwrap()
            .to_lowercase()
            .contains("weather"));
        assert_eq!(contents[0].show_spinner(), Some(true));
        assert_eq!(contents[0].id, turn_id);
        assert_eq!(contents[0].metadata_value("tool"), Some(&json!("get_weather")));
    }

    #[test]
    fn test_recipe_loader() {
        let message = ToolCallProcessor::new().describe(&call("get_recipe"));
        assert!(message.to_lowercase().contains("recipe"));
    }

    #[test]
    fn test_synthesized_messages() {
        let processor = ToolCallProcessor::new();
        assert_eq!(processor.describe(&call("get_stock_price")), "Getting stock price...");
        assert_eq!(processor.describe(&call("search_flights")), "Searching flights...");
        assert_eq!(processor.describe(&call("translate_text")), "Running translate text...");
        assert_eq!(processor.describe(&call("get_")), "Running get...");
        assert_eq!(processor.describe(&call("")), GENERIC_MESSAGE);
    }

    #[test]
    fn test_transfer_to_agent() {
        let processor = ToolCallProcessor::new();
        let transfer = FunctionCall::new(TRANSFER_TO_AGENT, json!({"agent_name": "recipe_assistant"}));
        assert_eq!(processor.describe(&transfer), "Asking the recipe assistant...");

        let without_target = FunctionCall::new(TRANSFER_TO_AGENT, json!({}));
        assert_eq!(processor.describe(&without_target), "Running transfer to agent...");
    }

    #[test]
    fn test_custom_message() {
        let processor = ToolCallProcessor::new().with_message("get_weather", "Looking outside...");
        assert_eq!(processor.describe(&call("get_weather")), "Looking outside...");
    }

    #[test]
    fn test_one_loader_per_call_and_text_ignored() {
        let event = RawEvent::control("orchestrator").with_content(
            EventContent::model()
                .with_part(Part::text("Let me check both"))
                .with_part(Part::FunctionCall(call("get_weather")))
                .with_part(Part::FunctionCall(call("get_recipe"))),
        );

        let contents = ToolCallProcessor::new().process_event(&event, Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(contents.len(), 2);
        assert!(contents.iter().all(Content::is_loader));
    }

    #[test]
    fn test_no_calls() {
        let processor = ToolCallProcessor::new();
        let session_id = Uuid::new_v4();
        let turn_id = Uuid::new_v4();

        assert!(processor
            .process_event(&RawEvent::text("orchestrator", "hi"), session_id, turn_id)
            .is_empty());
        assert!(processor
            .process_event(&RawEvent::control("orchestrator"), session_id, turn_id)
            .is_empty());
        assert!(processor
            .process_event(
                &RawEvent::function_response("weather_assistant", "get_weather", json!({"temperature": 22})),
                session_id,
                turn_id
            )
            .is_empty());
    }
}
