mod support;

use chrono::{Duration, Utc};
use predicates::str::contains;
use serde_json::Value;

use support::TestSpace;

fn node<'a>(graph: &'a Value, id: &str) -> &'a Value {
    graph["data"]["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .find(|node| node["id"].as_str() == Some(id))
        .unwrap_or_else(|| panic!("node {id} missing"))
}

fn split_two(space: &TestSpace, parent_title: &str) -> (String, String, String) {
    let parent = space.new_task(parent_title);
    let value = space.json(&["task", "split", &parent, "Left", "Right"]);
    let children = value["data"]["children"].as_array().expect("children");
    (
        parent,
        children[0]["id"].as_str().expect("id").to_string(),
        children[1]["id"].as_str().expect("id").to_string(),
    )
}

#[test]
fn direct_mode_centers_the_focal_task() {
    let space = TestSpace::init();
    let (parent, left, _right) = split_two(&space, "Root");

    let graph = space.json(&["graph", "--mode", "direct", "--task", &parent]);
    assert_eq!(graph["schema_version"].as_str(), Some("chronicle.v1"));
    assert_eq!(graph["command"].as_str(), Some("graph"));

    let nodes = graph["data"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 3);

    let focal = node(&graph, &parent);
    assert_eq!(focal["is_focal"].as_bool(), Some(true));
    assert_eq!(focal["position"]["x"].as_f64(), Some(0.0));
    assert_eq!(focal["position"]["y"].as_f64(), Some(0.0));

    let child = node(&graph, &left);
    assert_eq!(child["is_focal"].as_bool(), Some(false));
    assert_eq!(child["position"]["x"].as_f64(), Some(300.0));

    let edges = graph["data"]["edges"].as_array().expect("edges");
    assert_eq!(edges.len(), 2);
    assert!(edges
        .iter()
        .all(|edge| edge["kind"].as_str() == Some("split")));
}

#[test]
fn recursive_mode_covers_the_component_from_any_focal() {
    let space = TestSpace::init();
    let (parent, left, right) = split_two(&space, "Root");
    let merged = space.json(&["task", "merge", &left, &right, "--title", "Rejoined"]);
    let merged_id = merged["data"]["merged"]["id"]
        .as_str()
        .expect("merged id")
        .to_string();
    // An unrelated task stays outside the component.
    let outsider = space.new_task("Outsider");

    let from_left = space.json(&["graph", "--mode", "recursive", "--task", &left]);
    let nodes = from_left["data"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 4);
    assert!(nodes
        .iter()
        .all(|node| node["id"].as_str() != Some(outsider.as_str())));
    assert_eq!(node(&from_left, &left)["is_focal"].as_bool(), Some(true));

    let from_root = space.json(&["graph", "--mode", "recursive", "--task", &parent]);
    let mut ids_left: Vec<&str> = from_left["data"]["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .map(|node| node["id"].as_str().expect("id"))
        .collect();
    let mut ids_root: Vec<&str> = from_root["data"]["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .map(|node| node["id"].as_str().expect("id"))
        .collect();
    ids_left.sort_unstable();
    ids_root.sort_unstable();
    assert_eq!(ids_left, ids_root);

    // Both sides of each recording collapse to one edge: 2 splits + 2 merges.
    let edges = from_root["data"]["edges"].as_array().expect("edges");
    assert_eq!(edges.len(), 4);
    assert!(edges
        .iter()
        .any(|edge| edge["target"].as_str() == Some(merged_id.as_str())
            && edge["kind"].as_str() == Some("merge")));
}

#[test]
fn all_mode_renders_every_task_with_levels() {
    let space = TestSpace::init();
    let (parent, left, _right) = split_two(&space, "Root");
    let isolated = space.new_task("Isolated");

    let graph = space.json(&["graph", "--mode", "all"]);
    let nodes = graph["data"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 4);

    // Roots and isolated tasks sit in the level-0 column, descendants one
    // column to the right.
    assert_eq!(node(&graph, &parent)["position"]["x"].as_f64(), Some(0.0));
    assert_eq!(node(&graph, &isolated)["position"]["x"].as_f64(), Some(0.0));
    assert_eq!(node(&graph, &left)["position"]["x"].as_f64(), Some(300.0));
    assert!(nodes
        .iter()
        .all(|node| node["is_focal"].as_bool() == Some(false)));
}

#[test]
fn all_mode_time_filter_excludes_tasks_outside_the_window() {
    let space = TestSpace::init();
    let (_parent, _left, _right) = split_two(&space, "Root");

    let today = Utc::now().date_naive().to_string();
    let tomorrow = (Utc::now() + Duration::days(1)).date_naive().to_string();

    let within = space.json(&["graph", "--mode", "all", "--until", &today]);
    assert_eq!(
        within["data"]["nodes"].as_array().map(Vec::len),
        Some(3)
    );

    let beyond = space.json(&["graph", "--mode", "all", "--from", &tomorrow]);
    assert_eq!(beyond["data"]["nodes"].as_array().map(Vec::len), Some(0));
    assert_eq!(beyond["data"]["edges"].as_array().map(Vec::len), Some(0));
}

#[test]
fn direct_mode_requires_an_existing_focal_task() {
    let space = TestSpace::init();

    space
        .cmd()
        .args(["graph", "--mode", "direct", "--task", "ghost"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Task not found"));

    space
        .cmd()
        .args(["graph", "--mode", "recursive"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("--task is required"));
}

#[test]
fn invalid_mode_and_dates_are_rejected() {
    let space = TestSpace::init();

    space
        .cmd()
        .args(["graph", "--mode", "tree"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("invalid graph mode"));

    space
        .cmd()
        .args(["graph", "--mode", "all", "--from", "03/10/2025"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("invalid date"));
}

#[test]
fn rerunning_the_builder_yields_identical_output() {
    let space = TestSpace::init();
    let (parent, _left, _right) = split_two(&space, "Root");

    let first = space.json(&["graph", "--mode", "recursive", "--task", &parent]);
    let second = space.json(&["graph", "--mode", "recursive", "--task", &parent]);
    assert_eq!(first["data"], second["data"]);
}
