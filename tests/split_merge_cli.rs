mod support;

use predicates::str::contains;
use serde_json::Value;

use support::TestSpace;

fn ids_of(values: &Value) -> Vec<String> {
    values
        .as_array()
        .expect("array")
        .iter()
        .map(|task| task["id"].as_str().expect("id").to_string())
        .collect()
}

#[test]
fn split_creates_children_and_closes_the_parent() {
    let space = TestSpace::init();
    let parent = space.new_task("Big job");

    let value = space.json(&["task", "split", &parent, "Part one", "Part two"]);
    let children = value["data"]["children"].as_array().expect("children");
    assert_eq!(children.len(), 2);
    assert_eq!(value["data"]["parent"]["status"].as_str(), Some("done"));
    for child in children {
        assert_eq!(child["status"].as_str(), Some("todo"));
        assert_eq!(
            child["description"].as_str(),
            Some("Split from: Big job")
        );
    }
}

#[test]
fn split_records_events_on_both_sides() {
    let space = TestSpace::init();
    let parent = space.new_task("Big job");

    let value = space.json(&["task", "split", &parent, "Part one", "Part two"]);
    let child_id = value["data"]["children"][0]["id"]
        .as_str()
        .expect("child id")
        .to_string();

    let parent_history = space.json(&["task", "history", &parent]);
    let split_event = parent_history["data"]
        .as_array()
        .expect("events")
        .iter()
        .find(|event| !event["details"]["split_into"].is_null())
        .expect("split_into event on the parent stream")
        .clone();
    assert_eq!(split_event["type"].as_str(), Some("status_change"));
    assert_eq!(
        split_event["details"]["split_into"].as_array().map(Vec::len),
        Some(2)
    );

    let child_history = space.json(&["task", "history", &child_id]);
    let events = child_history["data"].as_array().expect("events");
    assert!(events.iter().any(|event| {
        event["type"].as_str() == Some("split_from")
            && event["details"]["source_id"].as_str() == Some(parent.as_str())
    }));
}

#[test]
fn relations_reflect_a_split_from_both_sides() {
    let space = TestSpace::init();
    let parent = space.new_task("A");

    let value = space.json(&["task", "split", &parent, "B", "C"]);
    let child_id = value["data"]["children"][0]["id"]
        .as_str()
        .expect("child id")
        .to_string();

    let of_parent = space.json(&["task", "relations", &parent]);
    assert_eq!(ids_of(&of_parent["data"]["children"]).len(), 2);
    assert_eq!(of_parent["data"]["parents"].as_array().map(Vec::len), Some(0));
    assert!(of_parent["data"]["merged_into"].is_null());

    let of_child = space.json(&["task", "relations", &child_id]);
    assert_eq!(ids_of(&of_child["data"]["parents"]), vec![parent.clone()]);

    space
        .cmd()
        .args(["task", "relations", &child_id])
        .assert()
        .success()
        .stdout(contains("split from:"));
}

#[test]
fn merge_creates_a_consolidated_task() {
    let space = TestSpace::init();
    let x = space.new_task("X");
    let y = space.new_task("Y");
    space
        .cmd()
        .args(["task", "edit", &x, "--tag", "shared", "--tag", "left"])
        .assert()
        .success();
    space
        .cmd()
        .args(["task", "edit", &y, "--tag", "shared", "--tag", "right"])
        .assert()
        .success();

    let value = space.json(&["task", "merge", &x, &y, "--title", "Z"]);
    let merged = &value["data"]["merged"];
    assert_eq!(merged["title"].as_str(), Some("Z"));
    assert_eq!(merged["description"].as_str(), Some("Merged from: X, Y"));
    let tags: Vec<&str> = merged["tags"]
        .as_array()
        .expect("tags")
        .iter()
        .map(|tag| tag.as_str().expect("tag"))
        .collect();
    assert_eq!(tags, vec!["shared", "left", "right"]);

    for source in [&x, &y] {
        let shown = space.json(&["task", "show", source]);
        assert_eq!(shown["data"]["task"]["status"].as_str(), Some("done"));
    }
}

#[test]
fn relations_reflect_a_merge_from_both_sides() {
    let space = TestSpace::init();
    let x = space.new_task("X");
    let y = space.new_task("Y");

    let value = space.json(&["task", "merge", &x, &y, "--title", "Z"]);
    let merged_id = value["data"]["merged"]["id"]
        .as_str()
        .expect("merged id")
        .to_string();

    let of_merged = space.json(&["task", "relations", &merged_id]);
    assert_eq!(
        ids_of(&of_merged["data"]["merged_from"]),
        vec![x.clone(), y.clone()]
    );
    assert!(of_merged["data"]["merged_into"].is_null());

    let of_source = space.json(&["task", "relations", &x]);
    assert_eq!(
        of_source["data"]["merged_into"]["id"].as_str(),
        Some(merged_id.as_str())
    );
}

#[test]
fn merge_requires_two_existing_sources() {
    let space = TestSpace::init();
    let x = space.new_task("X");

    space
        .cmd()
        .args(["task", "merge", &x, "ghost", "--title", "Z"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn task_without_relations_has_empty_buckets() {
    let space = TestSpace::init();
    let id = space.new_task("Loner");

    let value = space.json(&["task", "relations", &id]);
    assert_eq!(value["data"]["parents"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["data"]["children"].as_array().map(Vec::len), Some(0));
    assert_eq!(
        value["data"]["merged_from"].as_array().map(Vec::len),
        Some(0)
    );
    assert!(value["data"]["merged_into"].is_null());
}
