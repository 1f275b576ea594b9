use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::ALL_AGENTS;
use crate::processors::{ContentProcessor, TextContentProcessor, ToolCallProcessor};

/// An ordered list of processors run over every event of one agent
pub type Pipeline = Vec<Arc<dyn ContentProcessor>>;

/// Maps an agent identifier to the processors its events go through
///
/// Built once at startup and shared by every run; lookups never fail because agents
/// without a registration fall back to the default pipeline.
pub struct ProcessorRegistry {
    pipelines: HashMap<String, Pipeline>,
    default_pipeline: Pipeline,
}

impl ProcessorRegistry {
    /// A registry with no agent registrations and a text-only default pipeline
    pub fn empty() -> Self {
        Self {
            pipelines: HashMap::new(),
            default_pipeline: vec![Arc::new(TextContentProcessor::new())],
        }
    }

    /// Loaders first, so progress reaches the client before the text that follows
    pub fn standard_pipeline() -> Pipeline {
        vec![
            Arc::new(ToolCallProcessor::new()),
            Arc::new(TextContentProcessor::new()),
        ]
    }

    /// Register the pipeline for an agent, replacing any previous one
    pub fn register<S: Into<String>>(mut self, agent: S, pipeline: Pipeline) -> Self {
        self.pipelines.insert(agent.into(), pipeline);
        self
    }

    /// Replace the pipeline used for agents without a registration
    pub fn with_default_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.default_pipeline = pipeline;
        self
    }

    /// Processors for the given agent, in the order they must run
    pub fn get_processors(&self, agent: &str) -> &[Arc<dyn ContentProcessor>] {
        match self.pipelines.get(agent) {
            Some(pipeline) => pipeline,
            None => {
                tracing::debug!(agent, "no processors registered, using default pipeline");
                &self.default_pipeline
            }
        }
    }

    /// Identifiers with an explicit registration, sorted
    pub fn agents(&self) -> Vec<&str> {
        let mut agents: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        agents.sort_unstable();
        agents
    }
}

/// Every agent of the delegation tree gets the standard pipeline
impl Default for ProcessorRegistry {
    fn default() -> Self {
        ALL_AGENTS.iter().fold(Self::empty(), |registry, agent| {
            registry.register(agent.name, Self::standard_pipeline())
        })
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |pipeline: &Pipeline| pipeline.iter().map(|p| p.name().to_string()).collect::<Vec<_>>();
        let mut map = f.debug_map();
        for agent in self.agents() {
            map.entry(&agent, &names(&self.pipelines[agent]));
        }
        map.entry(&"<default>", &names(&self.default_pipeline));
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::Content;
    use crate::models::event::RawEvent;
    use serde_json::json;
    use uuid::Uuid;

    fn names(processors: &[Arc<dyn ContentProcessor>]) -> Vec<&str> {
        processors.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_default_registrations() {
        let registry = ProcessorRegistry::default();

        assert_eq!(
            registry.agents(),
            vec!["orchestrator", "recipe_assistant", "weather_assistant"]
        );
        for agent in registry.agents() {
            assert_eq!(names(registry.get_processors(agent)), vec!["tool_call", "text"]);
        }
    }

    #[test]
    fn test_unknown_agent_uses_default_pipeline() {
        let registry = ProcessorRegistry::default();

        assert_eq!(names(registry.get_processors("mystery_agent")), vec!["text"]);
        assert_eq!(names(registry.get_processors("unknown")), vec!["text"]);
        // lookups are exact
        assert_eq!(names(registry.get_processors("Orchestrator")), vec!["text"]);
    }

    #[test]
    fn test_custom_registration() {
        struct Echo;
        impl ContentProcessor for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn process_event(&self, event: &RawEvent, _: Uuid, turn_id: Uuid) -> Vec<Content> {
                vec![Content::message(turn_id, event.author_or_unknown())]
            }
        }

        let registry = ProcessorRegistry::empty()
            .register("echo_agent", vec![Arc::new(Echo)])
            .with_default_pipeline(Vec::new());

        let event = RawEvent::function_call("echo_agent", "get_weather", json!({}));
        let contents: Vec<Content> = registry
            .get_processors("echo_agent")
            .iter()
            .flat_map(|p| p.process_event(&event, Uuid::new_v4(), Uuid::new_v4()))
            .collect();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].text(), Some("echo_agent"));

        assert!(registry.get_processors("other").is_empty());
    }

    #[test]
    fn test_default_covers_agent_tree() {
        let registry = ProcessorRegistry::default();
        let mut names: Vec<&str> = ALL_AGENTS.iter().map(|a| a.name).collect();
        names.sort_unstable();
        assert_eq!(registry.agents(), names);
    }

    #[test]
    fn test_debug_lists_pipelines() {
        let output = format!("{:?}", ProcessorRegistry::default());
        assert!(output.contains("weather_assistant"));
        assert!(output.contains("<default>"));
    }
}
