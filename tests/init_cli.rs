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

#[test]
fn init_creates_config_and_store_files() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;

    trak_cmd(&root)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("initialized store"));

    assert!(root.path().join(".trak.toml").is_file());
    assert!(root.trak_dir().is_dir());
    assert!(root.active_path().is_file());
    assert!(root.archive_path().is_file());

    Ok(())
}

#[test]
fn init_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;

    let output = trak_cmd(&root)
        .args(["init", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;

    assert_eq!(value["schema_version"].as_str(), Some("trak.v1"));
    assert_eq!(value["command"].as_str(), Some("init"));
    assert_eq!(value["status"].as_str(), Some("success"));
    assert_eq!(value["data"]["created"]["config"].as_bool(), Some(false));
    assert_eq!(value["data"]["created"]["active_file"].as_bool(), Some(false));
    assert_eq!(
        value["data"]["created"]["archive_file"].as_bool(),
        Some(false)
    );

    Ok(())
}

#[test]
fn init_respects_existing_config_layout() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    root.write_config(
        r#"
[store]
dir = "records"
active_file = "open.jsonl"
archive_file = "done.jsonl"
"#,
    )?;

    trak_cmd(&root).arg("init").assert().success();

    assert!(root.path().join("records").join("open.jsonl").is_file());
    assert!(root.path().join("records").join("done.jsonl").is_file());
    assert!(!root.trak_dir().exists());

    // Commands read and write the configured layout
    trak_cmd(&root)
        .args(["add", "Custom layout task"])
        .assert()
        .success();

    let tasks = root.read_tasks(&root.path().join("records").join("open.jsonl"))?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Custom layout task");

    Ok(())
}

#[test]
fn init_rejects_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    root.write_config("[store]\nactive_file = \"../escape.jsonl\"\n")?;

    trak_cmd(&root)
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("error:"));

    Ok(())
}

#[test]
fn commands_before_init_point_at_init() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;

    trak_cmd(&root)
        .args(["add", "Too early"])
        .assert()
        .failure()
        .stderr(contains("Task store not found"))
        .stderr(contains("trak init"));

    trak_cmd(&root)
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("Task store not found"));

    Ok(())
}

#[test]
fn root_flag_targets_another_directory() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;

    support::trak_cmd()
        .args(["--root", &root.path().display().to_string(), "init"])
        .assert()
        .success();

    assert!(root.active_path().is_file());

    support::trak_cmd()
        .args(["--root", &root.path().display().to_string(), "add", "Remote"])
        .assert()
        .success();

    let tasks = root.active_tasks()?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Remote");

    Ok(())
}
