mod support;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use support::TestRoot;

fn trak_cmd(root: &TestRoot) -> Command {
    let mut cmd = support::trak_cmd();
    cmd.current_dir(root.path());
    cmd
}

fn add_task(root: &TestRoot, args: &[&str]) -> u64 {
    let mut full = vec!["add"];
    full.extend_from_slice(args);
    full.push("--json");
    let output = trak_cmd(root)
        .args(&full)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("add json");
    value["data"]["id"].as_u64().expect("task id")
}

fn show_json(root: &TestRoot, target: &str) -> Value {
    let output = trak_cmd(root)
        .args(["show", target, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("show json")
}

fn list_json(root: &TestRoot, args: &[&str]) -> Value {
    let mut full = vec!["list"];
    full.extend_from_slice(args);
    full.push("--json");
    let output = trak_cmd(root)
        .args(&full)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("list json")
}

#[test]
fn add_assigns_sequential_ids() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    assert_eq!(add_task(&root, &["First"]), 1);
    assert_eq!(add_task(&root, &["Second"]), 2);
    assert_eq!(add_task(&root, &["Third"]), 3);

    let tasks = root.active_tasks()?;
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].id, 1);
    assert_eq!(tasks[2].id, 3);

    Ok(())
}

#[test]
fn add_records_all_fields() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let id = add_task(
        &root,
        &[
            "Fix flaky login",
            "--description",
            "Fails on slow networks",
            "--design",
            "Retry with backoff",
            "--category",
            "auth",
            "--type",
            "bug",
            "--meta",
            "owner=alice",
            "--meta",
            "sprint=12",
        ],
    );

    let value = show_json(&root, &id.to_string());
    let task = &value["data"]["task"];
    assert_eq!(task["title"].as_str(), Some("Fix flaky login"));
    assert_eq!(task["description"].as_str(), Some("Fails on slow networks"));
    assert_eq!(task["design"].as_str(), Some("Retry with backoff"));
    assert_eq!(task["category"].as_str(), Some("auth"));
    assert_eq!(task["type"].as_str(), Some("bug"));
    assert_eq!(task["status"].as_str(), Some("open"));
    assert_eq!(task["meta"]["owner"].as_str(), Some("alice"));
    assert_eq!(task["meta"]["sprint"].as_str(), Some("12"));

    Ok(())
}

#[test]
fn add_prepend_puts_task_first() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    add_task(&root, &["Old"]);
    let urgent = add_task(&root, &["Urgent", "--prepend"]);

    let tasks = root.active_tasks()?;
    assert_eq!(tasks[0].id, urgent);
    assert_eq!(tasks[0].title, "Urgent");
    assert_eq!(tasks[1].title, "Old");

    // File order is list order
    let value = list_json(&root, &[]);
    assert_eq!(value["data"]["tasks"][0]["title"].as_str(), Some("Urgent"));

    Ok(())
}

#[test]
fn add_rejects_missing_parent() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    trak_cmd(&root)
        .args(["add", "Orphan", "--parent", "99"])
        .assert()
        .failure()
        .stderr(contains("Task not found: 99"));

    assert!(root.active_tasks()?.is_empty());

    Ok(())
}

#[test]
fn add_rejects_unknown_type() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    trak_cmd(&root)
        .args(["add", "Typo", "--type", "epic"])
        .assert()
        .failure()
        .stderr(contains("error:"));

    Ok(())
}

#[test]
fn list_default_excludes_closed() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    add_task(&root, &["Open one"]);
    let done = add_task(&root, &["Done one"]);
    trak_cmd(&root)
        .args(["update", &done.to_string(), "--status", "closed"])
        .assert()
        .success();

    let value = list_json(&root, &[]);
    assert_eq!(value["data"]["total"].as_u64(), Some(1));
    assert_eq!(
        value["data"]["tasks"][0]["title"].as_str(),
        Some("Open one")
    );

    let all = list_json(&root, &["--status", "any"]);
    assert_eq!(all["data"]["total"].as_u64(), Some(2));

    let closed = list_json(&root, &["--status", "closed"]);
    assert_eq!(closed["data"]["total"].as_u64(), Some(1));
    assert_eq!(
        closed["data"]["tasks"][0]["title"].as_str(),
        Some("Done one")
    );

    Ok(())
}

#[test]
fn list_filters_combine() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let parent = add_task(&root, &["Parent", "--category", "infra"]);
    add_task(
        &root,
        &[
            "Child bug",
            "--category",
            "infra",
            "--type",
            "bug",
            "--parent",
            &parent.to_string(),
        ],
    );
    add_task(&root, &["Other", "--category", "docs"]);

    let by_category = list_json(&root, &["--category", "infra"]);
    assert_eq!(by_category["data"]["total"].as_u64(), Some(2));

    let by_parent = list_json(&root, &["--parent", &parent.to_string()]);
    assert_eq!(by_parent["data"]["total"].as_u64(), Some(1));
    assert_eq!(
        by_parent["data"]["tasks"][0]["title"].as_str(),
        Some("Child bug")
    );

    let narrowed = list_json(&root, &["--category", "infra", "--type", "bug"]);
    assert_eq!(narrowed["data"]["total"].as_u64(), Some(1));

    let none = list_json(&root, &["--category", "infra", "--type", "story"]);
    assert_eq!(none["data"]["total"].as_u64(), Some(0));

    Ok(())
}

#[test]
fn list_title_matches_regex_or_substring() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    add_task(&root, &["Fix login timeout"]);
    add_task(&root, &["Fix logout crash"]);
    add_task(&root, &["Write docs"]);

    let by_substring = list_json(&root, &["--title", "Fix log"]);
    assert_eq!(by_substring["data"]["total"].as_u64(), Some(2));

    let by_regex = list_json(&root, &["--title", "^Fix log(in|out)"]);
    assert_eq!(by_regex["data"]["total"].as_u64(), Some(2));

    let anchored = list_json(&root, &["--title", "crash$"]);
    assert_eq!(anchored["data"]["total"].as_u64(), Some(1));
    assert_eq!(
        anchored["data"]["tasks"][0]["title"].as_str(),
        Some("Fix logout crash")
    );

    // An invalid regex falls back to a literal substring match
    add_task(&root, &["Weird (case"]);
    let literal = list_json(&root, &["--title", "(case"]);
    assert_eq!(literal["data"]["total"].as_u64(), Some(1));

    Ok(())
}

#[test]
fn show_resolves_id_or_exact_title() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let id = add_task(&root, &["Ship release"]);
    add_task(&root, &["Other work"]);

    let by_id = show_json(&root, &id.to_string());
    assert_eq!(by_id["data"]["task"]["title"].as_str(), Some("Ship release"));

    let by_title = show_json(&root, "Ship release");
    assert_eq!(by_title["data"]["task"]["id"].as_u64(), Some(id));

    trak_cmd(&root)
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(contains("Task not found: 42"));

    trak_cmd(&root)
        .args(["show", "No such title"])
        .assert()
        .failure()
        .stderr(contains("No task titled"));

    Ok(())
}

#[test]
fn show_rejects_ambiguous_title() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let first = add_task(&root, &["Duplicate"]);
    let second = add_task(&root, &["Duplicate"]);

    trak_cmd(&root)
        .args(["show", "Duplicate"])
        .assert()
        .failure()
        .stderr(contains(format!("matches tasks {first}, {second}")))
        .stderr(contains("Use an id"));

    Ok(())
}

#[test]
fn show_reports_children_and_block_state() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let parent = add_task(&root, &["Parent"]);
    let child_a = add_task(&root, &["Child A", "--parent", &parent.to_string()]);
    let child_b = add_task(&root, &["Child B", "--parent", &parent.to_string()]);

    let value = show_json(&root, &parent.to_string());
    let children: Vec<u64> = value["data"]["children"]
        .as_array()
        .expect("children array")
        .iter()
        .filter_map(Value::as_u64)
        .collect();
    assert_eq!(children, vec![child_a, child_b]);
    assert_eq!(value["data"]["blocked"]["blocked"].as_bool(), Some(false));

    Ok(())
}

#[test]
fn update_edits_fields() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let id = add_task(&root, &["Draft title"]);
    trak_cmd(&root)
        .args([
            "update",
            &id.to_string(),
            "--title",
            "Final title",
            "--status",
            "in_progress",
            "--category",
            "release",
        ])
        .assert()
        .success()
        .stdout(contains("updated task"));

    let value = show_json(&root, &id.to_string());
    let task = &value["data"]["task"];
    assert_eq!(task["title"].as_str(), Some("Final title"));
    assert_eq!(task["status"].as_str(), Some("in_progress"));
    assert_eq!(task["category"].as_str(), Some("release"));

    Ok(())
}

#[test]
fn update_merges_meta_and_clears_with_empty_value() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let id = add_task(&root, &["Meta task", "--meta", "owner=alice", "--meta", "sprint=12"]);

    trak_cmd(&root)
        .args([
            "update",
            &id.to_string(),
            "--meta",
            "owner=bob",
            "--meta",
            "sprint=",
        ])
        .assert()
        .success();

    let value = show_json(&root, &id.to_string());
    let meta = &value["data"]["task"]["meta"];
    assert_eq!(meta["owner"].as_str(), Some("bob"));
    assert!(meta.get("sprint").is_none());

    Ok(())
}

#[test]
fn update_reparents_and_clears_parent() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let first = add_task(&root, &["First parent"]);
    let second = add_task(&root, &["Second parent"]);
    let child = add_task(&root, &["Child", "--parent", &first.to_string()]);

    trak_cmd(&root)
        .args(["update", &child.to_string(), "--parent", &second.to_string()])
        .assert()
        .success();
    let value = show_json(&root, &child.to_string());
    assert_eq!(value["data"]["task"]["parent_id"].as_u64(), Some(second));

    trak_cmd(&root)
        .args(["update", &child.to_string(), "--parent", "none"])
        .assert()
        .success();
    let value = show_json(&root, &child.to_string());
    assert!(value["data"]["task"].get("parent_id").is_none());

    trak_cmd(&root)
        .args(["update", &child.to_string(), "--parent", &child.to_string()])
        .assert()
        .failure()
        .stderr(contains("cannot be its own parent"));

    Ok(())
}

#[test]
fn update_requires_fields_and_existing_task() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let id = add_task(&root, &["Lonely"]);

    trak_cmd(&root)
        .args(["update", &id.to_string()])
        .assert()
        .failure()
        .stderr(contains("No fields to update"));

    trak_cmd(&root)
        .args(["update", "99", "--title", "Ghost"])
        .assert()
        .failure()
        .stderr(contains("Task not found: 99"));

    Ok(())
}

#[test]
fn quiet_suppresses_human_output() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    trak_cmd(&root)
        .args(["add", "Silent", "--quiet"])
        .assert()
        .success()
        .stdout("");

    // --json wins over --quiet so scripts always get the envelope
    let output = trak_cmd(&root)
        .args(["list", "--quiet", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["data"]["total"].as_u64(), Some(1));

    Ok(())
}
