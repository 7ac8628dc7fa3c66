//! Structural diff between two plans.
//!
//! Chunks match by title, sub-steps match by description. The diff is what
//! the user reviews after a replan: it shows which chunks the model kept,
//! dropped, or reworked, and whether locked chunks really survived verbatim.

use std::collections::{HashMap, HashSet};

use momentum_protocol::{Chunk, Plan, SubStep};
use serde::Serialize;

/// Classification of one chunk or sub-step between two plans.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// One sub-step's fate. `data` is the new plan's sub-step, except for
/// removals, which carry the old one.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubStepDiff {
    pub status: DiffStatus,
    pub data: SubStep,
}

/// One chunk's fate. Chunks present in both plans always carry the full
/// sub-step diff list; added and removed chunks carry none, since every
/// sub-step inside them shares the chunk's fate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDiff {
    pub status: DiffStatus,
    pub data: Chunk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_step_diffs: Option<Vec<SubStepDiff>>,
}

/// Diff between two plans, one entry per chunk title seen in either.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlanDiff {
    pub chunks: Vec<ChunkDiff>,
}

/// Compares two plans chunk by chunk.
///
/// Entries come out in first-seen order: every old-plan title in old-plan
/// order, then titles that only the new plan has, in new-plan order. A title
/// in both plans is `modified` when its sub-step description set changed and
/// `unchanged` otherwise. Estimates are never compared, so an estimate
/// edited under an existing description goes undetected. Duplicate titles
/// within one plan collapse to the last occurrence.
///
/// Acceptance criteria are outside the diff; the user owns them after
/// generation.
pub fn diff_plans(old: &Plan, new: &Plan) -> PlanDiff {
    let old_by_title = index_by_title(&old.chunks);
    let new_by_title = index_by_title(&new.chunks);
    let mut chunks = Vec::new();
    for title in title_union(&old.chunks, &new.chunks) {
        let entry = match (old_by_title.get(title), new_by_title.get(title)) {
            (Some(old_chunk), None) => ChunkDiff {
                status: DiffStatus::Removed,
                data: (*old_chunk).clone(),
                sub_step_diffs: None,
            },
            (None, Some(new_chunk)) => ChunkDiff {
                status: DiffStatus::Added,
                data: (*new_chunk).clone(),
                sub_step_diffs: None,
            },
            (Some(old_chunk), Some(new_chunk)) => diff_matched_chunk(old_chunk, new_chunk),
            (None, None) => continue,
        };
        chunks.push(entry);
    }
    PlanDiff { chunks }
}

fn diff_matched_chunk(old_chunk: &Chunk, new_chunk: &Chunk) -> ChunkDiff {
    let old_by_description = index_by_description(&old_chunk.sub_steps);
    let new_by_description = index_by_description(&new_chunk.sub_steps);
    let mut sub_step_diffs = Vec::new();
    let mut modified = false;
    for description in description_union(&old_chunk.sub_steps, &new_chunk.sub_steps) {
        match (
            old_by_description.get(description),
            new_by_description.get(description),
        ) {
            (Some(old_step), None) => {
                modified = true;
                sub_step_diffs.push(SubStepDiff {
                    status: DiffStatus::Removed,
                    data: (*old_step).clone(),
                });
            }
            (None, Some(new_step)) => {
                modified = true;
                sub_step_diffs.push(SubStepDiff {
                    status: DiffStatus::Added,
                    data: (*new_step).clone(),
                });
            }
            (Some(_), Some(new_step)) => {
                // Estimates are not compared; a matching description is unchanged.
                sub_step_diffs.push(SubStepDiff {
                    status: DiffStatus::Unchanged,
                    data: (*new_step).clone(),
                });
            }
            (None, None) => {}
        }
    }
    ChunkDiff {
        status: if modified {
            DiffStatus::Modified
        } else {
            DiffStatus::Unchanged
        },
        data: new_chunk.clone(),
        sub_step_diffs: Some(sub_step_diffs),
    }
}

fn index_by_title(chunks: &[Chunk]) -> HashMap<&str, &Chunk> {
    chunks
        .iter()
        .map(|chunk| (chunk.chunk_title.as_str(), chunk))
        .collect()
}

fn index_by_description(sub_steps: &[SubStep]) -> HashMap<&str, &SubStep> {
    sub_steps
        .iter()
        .map(|step| (step.description.as_str(), step))
        .collect()
}

fn title_union<'a>(old: &'a [Chunk], new: &'a [Chunk]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for chunk in old.iter().chain(new.iter()) {
        if seen.insert(chunk.chunk_title.as_str()) {
            titles.push(chunk.chunk_title.as_str());
        }
    }
    titles
}

fn description_union<'a>(old: &'a [SubStep], new: &'a [SubStep]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut descriptions = Vec::new();
    for step in old.iter().chain(new.iter()) {
        if seen.insert(step.description.as_str()) {
            descriptions.push(step.description.as_str());
        }
    }
    descriptions
}
