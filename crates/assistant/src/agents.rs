//! Identifiers of the agents hosted by the execution engine.
//!
//! The agents themselves (prompts, models, tool implementations) live in the engine.
//! The pipeline only needs their names to attribute events and the names of the
//! tools they call to describe progress.

/// Top-level agent every turn is submitted to; it delegates to the leaf agents
pub const ORCHESTRATOR: &str = "orchestrator";

pub const WEATHER_ASSISTANT: &str = "weather_assistant";

pub const RECIPE_ASSISTANT: &str = "recipe_assistant";

pub const GET_WEATHER: &str = "get_weather";

pub const GET_RECIPE: &str = "get_recipe";

/// Static description of an agent known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: &'static str,
    pub sub_agents: &'static [&'static str],
}

pub const WEATHER_AGENT: AgentSpec = AgentSpec {
    name: WEATHER_ASSISTANT,
    sub_agents: &[],
};

pub const RECIPE_AGENT: AgentSpec = AgentSpec {
    name: RECIPE_ASSISTANT,
    sub_agents: &[],
};

pub const ORCHESTRATOR_AGENT: AgentSpec = AgentSpec {
    name: ORCHESTRATOR,
    sub_agents: &[WEATHER_ASSISTANT, RECIPE_ASSISTANT],
};

/// Every agent in the delegation tree, root first
pub const ALL_AGENTS: &[AgentSpec] = &[ORCHESTRATOR_AGENT, WEATHER_AGENT, RECIPE_AGENT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_is_rooted_at_orchestrator() {
        assert_eq!(ALL_AGENTS[0], ORCHESTRATOR_AGENT);
        for sub in ORCHESTRATOR_AGENT.sub_agents {
            assert!(
                ALL_AGENTS.iter().any(|agent| agent.name == *sub),
                "missing sub agent {}",
                sub
            );
        }
    }
}
