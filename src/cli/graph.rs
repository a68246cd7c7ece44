//! chronicle graph command implementation.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::graph::{GraphMode, LineageGraph, TimeFilter};
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct GraphOptions {
    pub mode: String,
    pub task: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub fn run(options: GraphOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let mode: GraphMode = options.mode.parse()?;
    let focal = match mode {
        GraphMode::Direct | GraphMode::Recursive => {
            let id = options.task.as_deref().ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "--task is required for {} mode",
                    mode.as_str()
                ))
            })?;
            // The builder degrades an absent focal task to an empty graph;
            // surface it as a user error here instead.
            if context.store.get_task(id)?.is_none() {
                return Err(Error::TaskNotFound(id.to_string()));
            }
            Some(id)
        }
        GraphMode::All => None,
    };

    let filter = TimeFilter {
        start: options
            .from
            .as_deref()
            .map(super::task::parse_date)
            .transpose()?,
        end: options
            .until
            .as_deref()
            .map(super::task::parse_date)
            .transpose()?,
    };
    let filter = if filter.is_unbounded() {
        None
    } else {
        Some(filter)
    };

    let graph = context
        .store
        .lineage_graph(mode, focal, filter.as_ref(), &context.config.graph)?;

    let mut human = HumanOutput::new(format!(
        "chronicle graph ({}): {} node(s), {} edge(s)",
        mode.as_str(),
        graph.nodes.len(),
        graph.edges.len()
    ));
    push_graph_details(&mut human, &graph);

    emit_success(options.output, "graph", &graph, Some(&human))
}

fn push_graph_details(human: &mut HumanOutput, graph: &LineageGraph) {
    for node in &graph.nodes {
        let marker = if node.is_focal { "*" } else { " " };
        human.push_detail(format!(
            "{marker} ({:>6.0},{:>5.0}) {} {}",
            node.position.x, node.position.y, node.id, node.task.title
        ));
    }
    for edge in &graph.edges {
        human.push_detail(format!(
            "{} -> {} [{}]",
            edge.source,
            edge.target,
            edge.kind.label()
        ));
    }
}
