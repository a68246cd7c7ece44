//! Lineage graph construction.
//!
//! Rebuilds the split/merge ancestry of tasks from a point-in-time snapshot
//! (task rows + structural history events) and lays it out as a positioned
//! directed graph. Three traversal modes:
//!
//! - `direct`: the focal task plus its immediate relations, two columns
//!   around a centered focal node.
//! - `recursive`: the full connected component around the focal task,
//!   reachability treats edges as undirected, columns by BFS level.
//! - `all`: every task in the (optionally time-filtered) snapshot, one BFS
//!   per root, isolated tasks at level 0.
//!
//! The whole module is a pure synchronous computation: the caller owns the
//! snapshot and re-invokes on every data change. Level assignment is
//! first-visit-wins BFS — deliberately not shortest-path-consistent for
//! diamond topologies; callers depend on that exact semantic.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::lineage::resolve_direct_relations;
use crate::model::{HistoryEvent, Task};
use crate::relations::{extract_edges, EdgeKind, StructuralEdge};

/// Traversal mode for the graph builder. An input selector, never persisted.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GraphMode {
    Direct,
    Recursive,
    All,
}

impl GraphMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphMode::Direct => "direct",
            GraphMode::Recursive => "recursive",
            GraphMode::All => "all",
        }
    }
}

impl std::str::FromStr for GraphMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(GraphMode::Direct),
            "recursive" => Ok(GraphMode::Recursive),
            "all" => Ok(GraphMode::All),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "invalid graph mode '{other}': must be direct, recursive, or all"
            ))),
        }
    }
}

/// Creation-date window for the `all` mode. Bounds are calendar dates; the
/// upper bound covers the whole day it names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimeFilter {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            let lower = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
            if instant < lower {
                return false;
            }
        }
        if let Some(end) = self.end {
            // Normalize to the last instant of the named day.
            if let Some(upper) = end.and_hms_milli_opt(23, 59, 59, 999) {
                if instant > Utc.from_utc_datetime(&upper) {
                    return false;
                }
            }
        }
        true
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Layout constants. Presentation parameters only: any values preserve the
/// level-to-column mapping and center-weighted stacking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GraphLayout {
    /// Horizontal distance between adjacent level columns.
    #[serde(default = "default_column_width")]
    pub column_width: f64,
    /// Vertical distance between siblings in direct/recursive modes.
    #[serde(default = "default_row_spacing")]
    pub row_spacing: f64,
    /// Vertical distance between siblings in the whole-store overview.
    #[serde(default = "default_overview_row_spacing")]
    pub overview_row_spacing: f64,
}

fn default_column_width() -> f64 {
    300.0
}

fn default_row_spacing() -> f64 {
    100.0
}

fn default_overview_row_spacing() -> f64 {
    120.0
}

impl Default for GraphLayout {
    fn default() -> Self {
        Self {
            column_width: default_column_width(),
            row_spacing: default_row_spacing(),
            overview_row_spacing: default_overview_row_spacing(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub task: Task,
    pub is_focal: bool,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl GraphEdge {
    fn from_structural(edge: &StructuralEdge) -> Self {
        Self {
            id: edge.id(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge.kind,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl LineageGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Build the lineage graph for one traversal mode.
///
/// `tasks` is the rendered task snapshot (the store already excludes
/// soft-deleted rows); `history` holds the structural events of the whole
/// log. A focal id is required by `direct` and `recursive`; `all` ignores it.
/// Every failure condition degrades to omission: an absent focal task or an
/// empty snapshot yields an empty graph, unresolvable ids are skipped, and
/// edges are only emitted between two rendered nodes.
pub fn build_lineage_graph(
    tasks: &[Task],
    history: &[HistoryEvent],
    mode: GraphMode,
    focal_task_id: Option<&str>,
    time_filter: Option<&TimeFilter>,
    layout: &GraphLayout,
) -> LineageGraph {
    match mode {
        GraphMode::Direct => match focal_task_id {
            Some(focal) => build_direct(tasks, history, focal, layout),
            None => LineageGraph::default(),
        },
        GraphMode::Recursive => match focal_task_id {
            Some(focal) => build_recursive(tasks, history, focal, layout),
            None => LineageGraph::default(),
        },
        GraphMode::All => build_all(tasks, history, time_filter, layout),
    }
}

/// Deduplicated adjacency over the structural edges of the event log.
///
/// Each relation is recorded from both sides of the split/merge, so the raw
/// extraction is a multiset; edges collapse here by identity (source, target,
/// kind) and keep their first-seen order.
struct Adjacency {
    forward: HashMap<String, Vec<(String, EdgeKind)>>,
    reverse: HashMap<String, Vec<(String, EdgeKind)>>,
    edges: Vec<StructuralEdge>,
}

impl Adjacency {
    fn from_history(history: &[HistoryEvent]) -> Self {
        let mut seen = HashSet::new();
        let mut forward: HashMap<String, Vec<(String, EdgeKind)>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<(String, EdgeKind)>> = HashMap::new();
        let mut edges = Vec::new();

        for edge in extract_edges(history) {
            if !seen.insert(edge.id()) {
                continue;
            }
            forward
                .entry(edge.source.clone())
                .or_default()
                .push((edge.target.clone(), edge.kind));
            reverse
                .entry(edge.target.clone())
                .or_default()
                .push((edge.source.clone(), edge.kind));
            edges.push(edge);
        }

        Self {
            forward,
            reverse,
            edges,
        }
    }

    fn forward_neighbors(&self, id: &str) -> &[(String, EdgeKind)] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn reverse_neighbors(&self, id: &str) -> &[(String, EdgeKind)] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn has_incoming(&self, id: &str) -> bool {
        self.reverse.contains_key(id)
    }
}

fn task_map(tasks: &[Task]) -> HashMap<String, Task> {
    tasks
        .iter()
        .map(|task| (task.id.clone(), task.clone()))
        .collect()
}

/// Emit the edges whose endpoints are both rendered.
fn edges_within(adjacency: &Adjacency, node_ids: &HashSet<String>) -> Vec<GraphEdge> {
    adjacency
        .edges
        .iter()
        .filter(|edge| node_ids.contains(&edge.source) && node_ids.contains(&edge.target))
        .map(GraphEdge::from_structural)
        .collect()
}

/// Center a group of `count` siblings around y = 0.
fn centered_y(index: usize, count: usize, spacing: f64) -> f64 {
    (index as f64 - (count as f64 - 1.0) / 2.0) * spacing
}

fn build_direct(
    tasks: &[Task],
    history: &[HistoryEvent],
    focal_id: &str,
    layout: &GraphLayout,
) -> LineageGraph {
    let map = task_map(tasks);
    let Some(focal) = map.get(focal_id) else {
        return LineageGraph::default();
    };

    let relations = resolve_direct_relations(focal_id, history, &map);

    let mut graph = LineageGraph::default();
    let mut placed = HashSet::new();
    let mut emitted = HashSet::new();

    let place = |graph: &mut LineageGraph,
                 placed: &mut HashSet<String>,
                 task: &Task,
                 is_focal: bool,
                 position: Position| {
        if placed.insert(task.id.clone()) {
            graph.nodes.push(GraphNode {
                id: task.id.clone(),
                task: task.clone(),
                is_focal,
                position,
            });
        }
    };

    let connect = |graph: &mut LineageGraph,
                   emitted: &mut HashSet<String>,
                   source: &str,
                   target: &str,
                   kind: EdgeKind| {
        let edge = StructuralEdge::new(source, target, kind);
        if emitted.insert(edge.id()) {
            graph.edges.push(GraphEdge::from_structural(&edge));
        }
    };

    place(
        &mut graph,
        &mut placed,
        focal,
        true,
        Position { x: 0.0, y: 0.0 },
    );

    // Left column: parents first, merged-from sources offset below them.
    let parent_count = relations.parents.len();
    for (index, parent) in relations.parents.iter().enumerate() {
        let y = centered_y(index, parent_count, layout.row_spacing);
        place(
            &mut graph,
            &mut placed,
            parent,
            false,
            Position {
                x: -layout.column_width,
                y,
            },
        );
        connect(&mut graph, &mut emitted, &parent.id, focal_id, EdgeKind::Split);
    }

    let merged_from_offset = if parent_count > 0 {
        parent_count as f64 * layout.row_spacing
    } else {
        0.0
    };
    let merged_from_count = relations.merged_from.len();
    for (index, source) in relations.merged_from.iter().enumerate() {
        let y = merged_from_offset + centered_y(index, merged_from_count, layout.row_spacing);
        place(
            &mut graph,
            &mut placed,
            source,
            false,
            Position {
                x: -layout.column_width,
                y,
            },
        );
        connect(&mut graph, &mut emitted, &source.id, focal_id, EdgeKind::Merge);
    }

    // Right column: children, then the merge target centered at y = 0.
    let child_count = relations.children.len();
    for (index, child) in relations.children.iter().enumerate() {
        let y = centered_y(index, child_count, layout.row_spacing);
        place(
            &mut graph,
            &mut placed,
            child,
            false,
            Position {
                x: layout.column_width,
                y,
            },
        );
        connect(&mut graph, &mut emitted, focal_id, &child.id, EdgeKind::Split);
    }

    if let Some(target) = &relations.merged_into {
        place(
            &mut graph,
            &mut placed,
            target,
            false,
            Position {
                x: layout.column_width,
                y: 0.0,
            },
        );
        connect(&mut graph, &mut emitted, focal_id, &target.id, EdgeKind::Merge);
    }

    graph
}

fn build_recursive(
    tasks: &[Task],
    history: &[HistoryEvent],
    focal_id: &str,
    layout: &GraphLayout,
) -> LineageGraph {
    let map = task_map(tasks);
    if !map.contains_key(focal_id) {
        return LineageGraph::default();
    }

    let adjacency = Adjacency::from_history(history);

    // Connected component: follow edges in both directions.
    let mut visited = HashSet::new();
    let mut discovery = Vec::new();
    let mut queue = VecDeque::new();
    visited.insert(focal_id.to_string());
    discovery.push(focal_id.to_string());
    queue.push_back(focal_id.to_string());

    while let Some(current) = queue.pop_front() {
        for (target, _) in adjacency.forward_neighbors(&current) {
            if visited.insert(target.clone()) {
                discovery.push(target.clone());
                queue.push_back(target.clone());
            }
        }
        for (source, _) in adjacency.reverse_neighbors(&current) {
            if visited.insert(source.clone()) {
                discovery.push(source.clone());
                queue.push_back(source.clone());
            }
        }
    }

    // Second pass: integer levels relative to the focal task. Forward edges
    // increment, reverse edges decrement; first-discovered level wins.
    let mut levels: HashMap<String, i64> = HashMap::new();
    let mut level_visited = HashSet::new();
    let mut queue = VecDeque::new();
    levels.insert(focal_id.to_string(), 0);
    level_visited.insert(focal_id.to_string());
    queue.push_back(focal_id.to_string());

    while let Some(current) = queue.pop_front() {
        let current_level = levels.get(&current).copied().unwrap_or(0);
        for (target, _) in adjacency.forward_neighbors(&current) {
            if level_visited.insert(target.clone()) {
                levels.insert(target.clone(), current_level + 1);
                queue.push_back(target.clone());
            }
        }
        for (source, _) in adjacency.reverse_neighbors(&current) {
            if level_visited.insert(source.clone()) {
                levels.insert(source.clone(), current_level - 1);
                queue.push_back(source.clone());
            }
        }
    }

    let graph = layout_levels(
        &discovery,
        &levels,
        &map,
        Some(focal_id),
        layout.column_width,
        layout.row_spacing,
    );
    finish_with_edges(graph, &adjacency)
}

fn build_all(
    tasks: &[Task],
    history: &[HistoryEvent],
    time_filter: Option<&TimeFilter>,
    layout: &GraphLayout,
) -> LineageGraph {
    let filtered: Vec<&Task> = tasks
        .iter()
        .filter(|task| {
            time_filter
                .map(|filter| filter.contains(task.created_at))
                .unwrap_or(true)
        })
        .collect();

    let map: HashMap<String, Task> = filtered
        .iter()
        .map(|task| (task.id.clone(), (*task).clone()))
        .collect();
    let adjacency = Adjacency::from_history(history);

    let mut levels: HashMap<String, i64> = HashMap::new();
    let mut visited = HashSet::new();
    let mut discovery = Vec::new();

    // One forward BFS per root (no incoming structural edge), level 0 at the
    // root, parent level + 1 below it. The adjacency covers the whole log, so
    // a traversal may pass through ids outside the filtered set; those get
    // levels but never nodes.
    for root in filtered.iter().filter(|task| !adjacency.has_incoming(&task.id)) {
        if !visited.insert(root.id.clone()) {
            continue;
        }
        levels.insert(root.id.clone(), 0);
        discovery.push(root.id.clone());
        let mut queue = VecDeque::new();
        queue.push_back(root.id.clone());

        while let Some(current) = queue.pop_front() {
            let current_level = levels.get(&current).copied().unwrap_or(0);
            for (target, _) in adjacency.forward_neighbors(&current) {
                if visited.insert(target.clone()) {
                    levels.insert(target.clone(), current_level + 1);
                    discovery.push(target.clone());
                    queue.push_back(target.clone());
                }
            }
        }
    }

    // Tasks unreachable from any root (cycles aside, mostly isolated nodes
    // and tasks whose ancestors fell outside the filter) sit at level 0.
    for task in &filtered {
        if visited.insert(task.id.clone()) {
            levels.insert(task.id.clone(), 0);
            discovery.push(task.id.clone());
        }
    }

    let graph = layout_levels(
        &discovery,
        &levels,
        &map,
        None,
        layout.column_width,
        layout.overview_row_spacing,
    );
    finish_with_edges(graph, &adjacency)
}

/// Group discovered ids into level columns and assign positions.
///
/// Columns are emitted in ascending level order; inside a column, nodes keep
/// discovery order. Ids without a task row are dropped here, so stacking
/// indexes count rendered nodes only.
fn layout_levels(
    discovery: &[String],
    levels: &HashMap<String, i64>,
    tasks: &HashMap<String, Task>,
    focal_id: Option<&str>,
    column_width: f64,
    row_spacing: f64,
) -> LineageGraph {
    let mut columns: BTreeMap<i64, Vec<&String>> = BTreeMap::new();
    for id in discovery {
        if !tasks.contains_key(id) {
            continue;
        }
        let level = levels.get(id).copied().unwrap_or(0);
        columns.entry(level).or_default().push(id);
    }

    let mut graph = LineageGraph::default();
    for (level, ids) in &columns {
        for (index, id) in ids.iter().enumerate() {
            let Some(task) = tasks.get(*id) else {
                continue;
            };
            graph.nodes.push(GraphNode {
                id: (*id).clone(),
                task: task.clone(),
                is_focal: focal_id == Some(id.as_str()),
                position: Position {
                    x: *level as f64 * column_width,
                    y: index as f64 * row_spacing,
                },
            });
        }
    }

    graph
}

fn finish_with_edges(mut graph: LineageGraph, adjacency: &Adjacency) -> LineageGraph {
    let node_ids: HashSet<String> = graph.nodes.iter().map(|node| node.id.clone()).collect();
    graph.edges = edges_within(adjacency, &node_ids);
    graph
}
