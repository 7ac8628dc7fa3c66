//! Instruction text and response schemas for the generation calls.
//!
//! Every call pins a JSON response schema so the model's reply decodes
//! straight into the plan types instead of being fished out of prose.

use serde_json::{Value, json};

pub(crate) const PLAN_INSTRUCTION: &str = "You are a planning coach who helps people build momentum on goals they find overwhelming. Break the user's goal into small, concrete chunks of work.

Rules:
- Produce at most 9 chunks. Fewer is better when the goal is small.
- Every chunk title starts with a verb and names one piece of work.
- Tag each chunk with the energy it needs: Low, Medium, or High.
- Give each chunk 1 to 5 sub-steps. Each sub-step starts with a verb and carries a rough time estimate such as \"10 min\".
- Finish with 3 to 5 acceptance criteria: short, checkable statements that say when the goal is done.
- Keep the tone supportive and plain. No filler, no judgment.

Reply with JSON only.";

pub(crate) const REPLAN_INSTRUCTION: &str = "You are a planning coach revising an existing plan. The user wants a fresh take on their goal, but some chunks are locked and must survive the revision.

Rules for locked chunks:
- Every locked chunk given to you MUST appear in the new plan exactly as provided: same title, same energy tag, same sub-steps, unmodified.
- Do not edit, merge, re-order relative to each other, or drop a locked chunk.
- Build the rest of the plan around them.

Rules for the plan:
- Produce at most 9 chunks in total, locked ones included.
- Every new chunk title starts with a verb and names one piece of work.
- Tag each new chunk with the energy it needs: Low, Medium, or High.
- Give each new chunk 1 to 5 sub-steps. Each sub-step starts with a verb and carries a rough time estimate such as \"10 min\".
- Finish with 3 to 5 acceptance criteria: short, checkable statements that say when the goal is done.
- Keep the tone supportive and plain.

Reply with JSON only.";

pub(crate) const SUGGESTIONS_INSTRUCTION: &str = "You are a planning coach. The user is stuck on one chunk of their plan and needs a nudge, not a lecture.

Offer 2 or 3 suggestions for getting unstuck. Each suggestion is a single short imperative sentence. Be encouraging and never judgmental.

Reply with JSON only.";

/// Shown when suggestion generation fails. Getting unstuck should never be
/// blocked on the network.
pub(crate) const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "Take a 5-minute break and come back.",
    "Break the first sub-step into an even smaller task.",
    "Ask someone for their perspective.",
];

/// Response schema for plan and replan calls, in the Gemini schema dialect
/// (upper-case type names, `propertyOrdering`).
pub(crate) fn plan_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "chunks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "chunkTitle": { "type": "STRING" },
                        "energyTag": {
                            "type": "STRING",
                            "enum": ["Low", "Medium", "High"]
                        },
                        "subSteps": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "description": { "type": "STRING" },
                                    "estimate": { "type": "STRING" }
                                },
                                "required": ["description", "estimate"],
                                "propertyOrdering": ["description", "estimate"]
                            }
                        }
                    },
                    "required": ["chunkTitle", "energyTag", "subSteps"],
                    "propertyOrdering": ["chunkTitle", "energyTag", "subSteps"]
                }
            },
            "acceptanceCriteria": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["chunks", "acceptanceCriteria"],
        "propertyOrdering": ["chunks", "acceptanceCriteria"]
    })
}

/// Response schema for stuck-suggestion calls.
pub(crate) fn suggestions_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["suggestions"]
    })
}

pub(crate) fn plan_user_text(goal_text: &str) -> String {
    format!("Goal: {goal_text}")
}

pub(crate) fn replan_user_text(goal_text: &str, locked_chunks_json: &str) -> String {
    format!("Goal: {goal_text}\n\nLocked chunks (preserve exactly as given):\n{locked_chunks_json}")
}

pub(crate) fn suggestions_user_text(goal_text: &str, chunk_json: &str) -> String {
    format!("Goal: {goal_text}\n\nChunk the user is stuck on:\n{chunk_json}")
}
