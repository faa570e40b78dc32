//! Prompt templates per task level.
//!
//! Placeholders: `{character_info}`, `{dialogue}`, `{scenario_context}`.

use std::path::Path;

use anyhow::Context;

use crate::model::Task;

pub const SCENARIO_UNDERSTANDING_PROMPT: &str = r#"You are observing a short scene in a home. The frames show what the character is doing.

Character profile:
{character_info}

What the character said:
{dialogue}

Scene notes:
{scenario_context}

Describe the situation: what happened to the character, how they feel, and what they might need. Answer in a few sentences."#;

pub const EMPATHETIC_PLANNING_PROMPT: &str = r#"You are a caring household assistant. The frames show the character's recent activity.

Character profile:
{character_info}

What the character said:
{dialogue}

Scene notes:
{scenario_context}

Write a short high-level plan (one paragraph) for how you would respond with empathy, considering the character's personality and current state."#;

pub const EMPATHETIC_ACTION_PROMPT: &str = r#"You are a caring household robot. The frames show the character's recent activity.

Character profile:
{character_info}

What the character said:
{dialogue}

Scene notes:
{scenario_context}

Give a concrete, ordered list of actions you would take to help the character empathetically. Use one short action per line."#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn builtin(task: Task) -> Self {
        let text = match task {
            Task::ScenarioUnderstanding => SCENARIO_UNDERSTANDING_PROMPT,
            Task::EmpatheticPlanning => EMPATHETIC_PLANNING_PROMPT,
            Task::EmpatheticAction => EMPATHETIC_ACTION_PROMPT,
        };
        Self {
            text: text.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt {}", path.display()))?;
        Ok(Self::new(text.trim()))
    }

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn render(&self, character_info: &str, dialogue: &str, scenario_context: &str) -> String {
        self.text
            .replace("{character_info}", character_info)
            .replace("{dialogue}", dialogue)
            .replace("{scenario_context}", scenario_context)
    }
}
