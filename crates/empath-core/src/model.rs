use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

/// One scenario from the evaluation dataset.
///
/// Identified by its position in the dataset; that index is the join key
/// for every downstream artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub character_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub action_id: String,
    #[serde(default)]
    pub dialogue: String,
    #[serde(default, alias = "scenario")]
    pub scenario_context: String,
}

/// One durable line of the checkpoint ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRow {
    pub data_idx: usize,
    pub response: String,
}

/// Normalized export of a checkpoint row, re-enumerated by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub id: usize,
    pub prediction: String,
}

/// What the generation client receives besides the prompt.
#[derive(Debug, Clone, Default)]
pub struct ScenarioInput {
    pub data_idx: usize,
    /// Frame directory for multimodal clients; `None` for text-only runs.
    pub asset: Option<PathBuf>,
}

impl ScenarioInput {
    pub fn text(data_idx: usize) -> Self {
        Self {
            data_idx,
            asset: None,
        }
    }

    pub fn frames(data_idx: usize, dir: impl Into<PathBuf>) -> Self {
        Self {
            data_idx,
            asset: Some(dir.into()),
        }
    }
}

/// Evaluation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    ScenarioUnderstanding,
    EmpatheticPlanning,
    #[default]
    EmpatheticAction,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::ScenarioUnderstanding => "scenario_understanding",
            Task::EmpatheticPlanning => "empathetic_planning",
            Task::EmpatheticAction => "empathetic_action",
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Task::ScenarioUnderstanding => 1,
            Task::EmpatheticPlanning => 2,
            Task::EmpatheticAction => 3,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scenario_understanding" | "l1" => Ok(Task::ScenarioUnderstanding),
            "empathetic_planning" | "l2" => Ok(Task::EmpatheticPlanning),
            "empathetic_action" | "l3" => Ok(Task::EmpatheticAction),
            other => Err(format!(
                "unknown task '{}' (expected scenario_understanding, empathetic_planning or empathetic_action)",
                other
            )),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
