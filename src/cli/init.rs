//! trak init command implementation
//!
//! Creates the store directory, both task files and a default config.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    store_dir: bool,
    active_file: bool,
    archive_file: bool,
}

pub fn run(root: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let root = match root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Root is not a directory: {}",
            root.display()
        )));
    }

    // A pre-existing .trak.toml decides the layout; otherwise defaults apply
    let config = Config::load_from_root(&root)?;

    let created = InitCreated {
        store_dir: ensure_dir(&config.store_dir(&root))?,
        active_file: ensure_file(&config.active_path(&root))?,
        archive_file: ensure_file(&config.archive_path(&root))?,
        config: ensure_config(&root, &config)?,
    };

    let created_items: Vec<String> = [
        (created.config, CONFIG_FILE_NAME.to_string()),
        (created.store_dir, format!("{}/", config.store.dir)),
        (created.active_file, config.store.active_file.clone()),
        (created.archive_file, config.store.archive_file.clone()),
    ]
    .into_iter()
    .filter(|(was_created, _)| *was_created)
    .map(|(_, label)| label)
    .collect();

    let header = if created_items.is_empty() {
        "trak init: nothing to do"
    } else {
        "trak init: initialized store"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    let created_summary = if created_items.is_empty() {
        "none".to_string()
    } else {
        created_items.join(", ")
    };
    human.push_summary("created", created_summary);
    human.push_next_step("trak add \"<title>\"");
    human.push_next_step("trak list");

    let report = InitReport { root, created };
    emit_success(OutputOptions { json, quiet }, "init", &report, Some(&human))
}

fn ensure_config(root: &Path, config: &Config) -> Result<bool> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        config.save(&config_path)?;
        return Ok(true);
    }
    if !config_path.is_file() {
        return Err(Error::OperationFailed(format!(
            "{CONFIG_FILE_NAME} exists but is not a file: {}",
            config_path.display()
        )));
    }
    Ok(false)
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        return Ok(true);
    }
    if !path.is_dir() {
        return Err(Error::OperationFailed(format!(
            "Expected directory at {}",
            path.display()
        )));
    }
    Ok(false)
}

fn ensure_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        std::fs::write(path, "")?;
        return Ok(true);
    }
    if !path.is_file() {
        return Err(Error::OperationFailed(format!(
            "Expected file at {}",
            path.display()
        )));
    }
    Ok(false)
}
