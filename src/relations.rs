//! Relation extraction: history events to typed structural edges.
//!
//! Every split/merge is recorded from both participants' perspectives (an
//! append-only per-task log), so a single relation usually shows up as two
//! correlated events. The extractor maps each event to the edge it asserts
//! and leaves reconciliation of the two sides to the graph builder, which
//! dedupes by edge identity.

use serde::Serialize;

use crate::model::{HistoryEvent, HistoryType};

/// Kind of a structural edge between two tasks.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Split,
    Merge,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Split => "split",
            EdgeKind::Merge => "merge",
        }
    }

    /// Human label used when rendering an edge.
    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Split => "Split",
            EdgeKind::Merge => "Merge",
        }
    }
}

/// A directed split/merge relation derived from the event log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuralEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl StructuralEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Stable edge identity. Includes the kind so that a split and a merge
    /// between the same pair of tasks stay distinct.
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.source, self.target, self.kind.as_str())
    }
}

/// Extract the structural edges asserted by a set of history events.
///
/// Pure function of its input: identical events always yield the same edge
/// multiset, in input order. Events of types that carry no structural
/// information, and events whose payload lacks the fields expected for their
/// type, contribute nothing.
pub fn extract_edges(events: &[HistoryEvent]) -> Vec<StructuralEdge> {
    let mut edges = Vec::new();
    for event in events {
        append_edges(event, &mut edges);
    }
    edges
}

fn append_edges(event: &HistoryEvent, edges: &mut Vec<StructuralEdge>) {
    match event.event_type {
        HistoryType::SplitFrom => {
            if let Some(source_id) = non_empty(event.details.source_id.as_deref()) {
                edges.push(StructuralEdge::new(
                    source_id,
                    event.task_id.as_str(),
                    EdgeKind::Split,
                ));
            }
        }
        HistoryType::StatusChange => {
            // Only split side effects carry structure; plain status changes don't.
            if let Some(children) = &event.details.split_into {
                for child in children {
                    if let Some(child) = non_empty(Some(child.as_str())) {
                        edges.push(StructuralEdge::new(
                            event.task_id.as_str(),
                            child,
                            EdgeKind::Split,
                        ));
                    }
                }
            }
        }
        HistoryType::MergedInto => {
            if let Some(sources) = &event.details.merged_from {
                for source in sources {
                    if let Some(source) = non_empty(Some(source.as_str())) {
                        edges.push(StructuralEdge::new(
                            source,
                            event.task_id.as_str(),
                            EdgeKind::Merge,
                        ));
                    }
                }
            } else if let Some(target_id) = non_empty(event.details.target_id.as_deref()) {
                edges.push(StructuralEdge::new(
                    event.task_id.as_str(),
                    target_id,
                    EdgeKind::Merge,
                ));
            }
        }
        HistoryType::Created | HistoryType::Updated => {}
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
