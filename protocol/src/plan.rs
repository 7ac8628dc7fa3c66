use serde::{Deserialize, Serialize};

/// Rough effort label attached to each chunk so users can match work to how
/// they feel. Serialized capitalized ("Low", "Medium", "High") to match the
/// wire format the generation model is asked to produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EnergyTag {
    Low,
    Medium,
    High,
}

/// A single actionable item inside a chunk. The `description` doubles as the
/// sub-step's identity when two plans are compared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub description: String,
    /// Free-form effort estimate, e.g. "15 min". Never interpreted.
    pub estimate: String,
}

/// A titled group of sub-steps. The `chunk_title` is the chunk's identity
/// when two plans are compared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_title: String,
    pub energy_tag: EnergyTag,
    pub sub_steps: Vec<SubStep>,
}

/// A full plan for one goal: ordered chunks plus the acceptance criteria that
/// say when the goal is done.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub chunks: Vec<Chunk>,
    pub acceptance_criteria: Vec<String>,
}

/// Why a JSON value was rejected as a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanShapeError {
    #[error("response has no `chunks` array")]
    MissingChunks,
    #[error("response has no `acceptanceCriteria` array")]
    MissingCriteria,
    #[error("failed to decode plan: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Plan {
    /// Decodes a plan from a JSON value, first checking the shape the rest of
    /// the system relies on: both `chunks` and `acceptanceCriteria` must be
    /// present and must be arrays. Anything else is rejected before the field
    /// level decode runs, so callers get a stable error for the common case
    /// of a model reply that drifted from the schema.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, PlanShapeError> {
        if !value.get("chunks").is_some_and(serde_json::Value::is_array) {
            return Err(PlanShapeError::MissingChunks);
        }
        if !value
            .get("acceptanceCriteria")
            .is_some_and(serde_json::Value::is_array)
        {
            return Err(PlanShapeError::MissingCriteria);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Splits user-edited acceptance criteria text into one criterion per line,
/// dropping lines that are empty or whitespace only. Line content is kept
/// as typed.
pub fn parse_acceptance_criteria(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
