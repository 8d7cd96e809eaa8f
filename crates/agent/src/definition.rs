use wc_domain::config::AgentConfig;

/// What the agent is: identity, model and behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    /// Let the model ground answers with Google Search.
    pub google_search: bool,
    pub temperature: Option<f32>,
}

impl AgentDefinition {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            model: cfg.model.clone(),
            description: cfg.description.clone(),
            instruction: cfg.instruction.clone(),
            google_search: cfg.google_search,
            temperature: cfg.temperature,
        }
    }
}

impl Default for AgentDefinition {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_wikipedia_analyst() {
        let def = AgentDefinition::default();
        assert_eq!(def.name, "wikipedia_analyst");
        assert_eq!(def.model, "gemini-2.5-flash");
        assert!(def.google_search);
        assert!(def.instruction.starts_with("You are a Wikipedia-style agent"));
    }
}
