use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Author the engine uses for events that echo the user's own message
pub const USER_AUTHOR: &str = "user";

/// Identifier used for events that arrive without an author
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// A tool invocation requested by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new<S: Into<String>>(name: S, args: Value) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            name: name.into(),
            args,
        }
    }
}

/// The result of a tool invocation, reported back into the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub response: Value,
}

/// One piece of an event's payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePart", into = "WirePart")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
    /// A part kind the pipeline has no use for (inline data, code execution, ...)
    Unsupported,
}

impl Part {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Part::FunctionResponse(response) => Some(response),
            _ => None,
        }
    }
}

// The engine encodes a part as an object with one populated field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl From<WirePart> for Part {
    fn from(wire: WirePart) -> Self {
        if let Some(call) = wire.function_call {
            Part::FunctionCall(call)
        } else if let Some(response) = wire.function_response {
            Part::FunctionResponse(response)
        } else if let Some(text) = wire.text {
            Part::Text(text)
        } else {
            Part::Unsupported
        }
    }
}

impl From<Part> for WirePart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text),
                ..Default::default()
            },
            Part::FunctionCall(call) => WirePart {
                function_call: Some(call),
                ..Default::default()
            },
            Part::FunctionResponse(response) => WirePart {
                function_response: Some(response),
                ..Default::default()
            },
            Part::Unsupported => WirePart::default(),
        }
    }
}

/// The payload of an event: an ordered list of parts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl EventContent {
    /// Content for a message typed by the user
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self {
            role: Some(USER_AUTHOR.to_string()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn model() -> Self {
        Self {
            role: Some("model".to_string()),
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }
}

/// One unit of output from the execution engine
///
/// Every field is optional on the wire; pure control events carry no content at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EventContent>,
    #[serde(default)]
    pub partial: bool,
}

impl RawEvent {
    /// A content-less event from the given author
    pub fn control<S: Into<String>>(author: S) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            author: Some(author.into()),
            ..Default::default()
        }
    }

    /// A complete text event
    pub fn text<A: Into<String>, T: Into<String>>(author: A, text: T) -> Self {
        Self::control(author).with_content(EventContent::model().with_part(Part::text(text)))
    }

    /// An event requesting a single tool invocation
    pub fn function_call<A: Into<String>, N: Into<String>>(author: A, name: N, args: Value) -> Self {
        Self::control(author).with_content(
            EventContent::model().with_part(Part::FunctionCall(FunctionCall::new(name, args))),
        )
    }

    /// An event reporting a tool result
    pub fn function_response<A: Into<String>, N: Into<String>>(
        author: A,
        name: N,
        response: Value,
    ) -> Self {
        Self::control(author).with_content(EventContent {
            role: Some(USER_AUTHOR.to_string()),
            parts: vec![Part::FunctionResponse(FunctionResponse {
                id: None,
                name: name.into(),
                response,
            })],
        })
    }

    pub fn with_content(mut self, content: EventContent) -> Self {
        self.content = Some(content);
        self
    }

    /// Mark the event as a streamed fragment of a longer response
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// The agent this event is attributed to, `"unknown"` when absent
    pub fn author_or_unknown(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }

    pub fn is_user_echo(&self) -> bool {
        self.author.as_deref() == Some(USER_AUTHOR)
    }

    /// The parts of the event, empty for control events
    pub fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts().iter().filter_map(Part::as_function_call)
    }

    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts().iter().filter_map(Part::as_function_response)
    }

    /// First text part of the event, if any
    pub fn first_text(&self) -> Option<&str> {
        self.parts().first().and_then(Part::as_text)
    }

    /// Whether this event is the agent's terminal answer for the run: a complete
    /// (non-partial) event that neither requests a tool nor reports a tool result.
    pub fn is_final_response(&self) -> bool {
        !self.partial
            && self.function_calls().next().is_none()
            && self.function_responses().next().is_none()
    }
}
