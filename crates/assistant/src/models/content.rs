use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The kind of a [`Content`] item. The set is closed: clients switch on it to know
/// which keys `data` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Text authored by an agent, `data = {"text": ...}`
    Message,
    /// Progress indicator, `data = {"message": ..., "show_spinner": bool}`
    Loader,
    /// Free-form annotations, no required keys
    Metadata,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Message => "message",
            ContentType::Loader => "loader",
            ContentType::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// The normalized output unit delivered to clients
///
/// Every item produced for one user turn shares the same `id`. The keys of `data`
/// are determined by `content_type`; use the typed constructors to build one and the
/// typed accessors to read one.
pub struct Content {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Content {
    pub fn message<S: Into<String>>(id: Uuid, text: S) -> Self {
        let mut data = Map::new();
        data.insert("text".to_string(), Value::String(text.into()));
        Content {
            id,
            content_type: ContentType::Message,
            data,
            metadata: None,
        }
    }

    pub fn loader<S: Into<String>>(id: Uuid, message: S, show_spinner: bool) -> Self {
        let mut data = Map::new();
        data.insert("message".to_string(), Value::String(message.into()));
        data.insert("show_spinner".to_string(), Value::Bool(show_spinner));
        Content {
            id,
            content_type: ContentType::Loader,
            data,
            metadata: None,
        }
    }

    pub fn metadata(id: Uuid, data: Map<String, Value>) -> Self {
        Content {
            id,
            content_type: ContentType::Metadata,
            data,
            metadata: None,
        }
    }

    /// Attach annotations to the content, replacing any previous ones
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Add a single annotation to the content
    pub fn with_metadata_entry<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn is_message(&self) -> bool {
        self.content_type == ContentType::Message
    }

    pub fn is_loader(&self) -> bool {
        self.content_type == ContentType::Loader
    }

    /// Get the text if this is a message item
    pub fn text(&self) -> Option<&str> {
        match self.content_type {
            ContentType::Message => self.data.get("text").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Get the progress message if this is a loader item
    pub fn loader_message(&self) -> Option<&str> {
        match self.content_type {
            ContentType::Loader => self.data.get("message").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Whether a loader item asks the client to show a spinner
    pub fn show_spinner(&self) -> Option<bool> {
        match self.content_type {
            ContentType::Loader => self.data.get("show_spinner").and_then(Value::as_bool),
            _ => None,
        }
    }

    /// Look up a single annotation
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serializes_with_type_tag() {
        let id = Uuid::new_v4();
        let content = Content::message(id, "Hello").with_metadata_entry("session_id", json!("abc"));

        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["type"], json!("message"));
        assert_eq!(value["data"], json!({"text": "Hello"}));
        assert_eq!(value["metadata"], json!({"session_id": "abc"}));
        assert_eq!(value["id"], json!(id.to_string()));
    }

    #[test]
    fn test_loader_fields() {
        let content = Content::loader(Uuid::new_v4(), "Checking the weather...", true);

        assert!(content.is_loader());
        assert_eq!(content.loader_message(), Some("Checking the weather..."));
        assert_eq!(content.show_spinner(), Some(true));
        assert_eq!(content.text(), None);
    }

    #[test]
    fn test_accessors_check_type() {
        // A metadata item that happens to carry a "text" key is still not a message
        let mut data = Map::new();
        data.insert("text".to_string(), json!("not a message"));
        let content = Content::metadata(Uuid::new_v4(), data);

        assert_eq!(content.text(), None);
        assert_eq!(content.loader_message(), None);
        assert_eq!(content.show_spinner(), None);
    }

    #[test]
    fn test_metadata_omitted_when_absent() {
        let content = Content::message(Uuid::new_v4(), "x");
        let value = serde_json::to_value(&content).unwrap();
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_deserialize_from_client_json() {
        let content: Content = serde_json::from_value(json!({
            "id": "6b1f4a2e-8d3c-4f5a-9b7e-1c2d3e4f5a6b",
            "type": "loader",
            "data": {"message": "Thinking...", "show_spinner": true}
        }))
        .unwrap();

        assert_eq!(content.content_type, ContentType::Loader);
        assert_eq!(content.loader_message(), Some("Thinking..."));
        assert!(content.metadata.is_none());
    }
}
