use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::seed;
use crate::store::{DEFAULT_ACTIVE_CATEGORY, TaskStore};
use crate::task::{Category, Task, ViewMode};

pub const TASKS_KEY: &str = "fancy-todo-tasks";
pub const CATEGORIES_KEY: &str = "fancy-todo-categories";
pub const ACTIVE_CATEGORY_KEY: &str = "fancy-todo-active-category";
pub const VIEW_KEY: &str = "fancy-todo-view";

/// String-keyed, string-valued storage. Values are JSON-encoded by the
/// callers here, so even bare strings carry quotes on the wire.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// One file per key under the data directory, replaced atomically on
/// every write.
#[derive(Debug)]
pub struct FileKv {
    data_dir: PathBuf,
}

impl FileKv {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        info!(data_dir = %data_dir.display(), "opened key-value store");
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.key_path(key);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing {}", path.display()))?;
        }
        Ok(())
    }
}

/// Every key loads independently and fails soft: a missing, unreadable,
/// or malformed value falls back to its default. An empty task or
/// category list also falls back to the seed set, which is how a first
/// launch gets its sample data.
#[tracing::instrument(skip(kv, now))]
pub fn load_state(kv: &dyn KvStore, now: DateTime<Utc>) -> TaskStore {
    let tasks = match load_key::<Vec<Task>>(kv, TASKS_KEY) {
        Some(stored) if !stored.is_empty() => {
            stored.into_iter().map(unescape_task_text).collect()
        }
        _ => {
            debug!("no stored tasks; seeding");
            seed::seed_tasks(now)
        }
    };

    let categories = match load_key::<Vec<Category>>(kv, CATEGORIES_KEY) {
        Some(stored) if !stored.is_empty() => stored,
        _ => {
            debug!("no stored categories; seeding");
            seed::seed_categories()
        }
    };

    let active_category = load_key::<String>(kv, ACTIVE_CATEGORY_KEY)
        .unwrap_or_else(|| DEFAULT_ACTIVE_CATEGORY.to_string());
    let view_mode = load_key::<ViewMode>(kv, VIEW_KEY).unwrap_or_default();

    debug!(
        tasks = tasks.len(),
        categories = categories.len(),
        active_category = %active_category,
        view = view_mode.as_str(),
        "loaded state"
    );
    TaskStore::new(tasks, categories, active_category, view_mode)
}

/// Writes all four keys. Failures are logged and swallowed; a broken
/// data directory degrades to an in-memory session, never an abort.
#[tracing::instrument(skip(kv, store))]
pub fn save_state(kv: &mut dyn KvStore, store: &TaskStore) {
    save_key(kv, TASKS_KEY, &storage_tasks(store.tasks()));
    save_key(kv, CATEGORIES_KEY, store.categories());
    save_key(kv, ACTIVE_CATEGORY_KEY, store.active_category());
    save_key(kv, VIEW_KEY, &store.view_mode());
}

fn load_key<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "no stored value");
            return None;
        }
        Err(err) => {
            warn!(key, error = %err, "failed reading stored value; using default");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "failed parsing stored value; using default");
            None
        }
    }
}

fn save_key<T: Serialize + ?Sized>(kv: &mut dyn KvStore, key: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(key, error = %err, "failed encoding value; skipping key");
            return;
        }
    };
    if let Err(err) = kv.set(key, &encoded) {
        warn!(key, error = %err, "failed writing value; continuing");
    }
}

fn storage_tasks(tasks: &[Task]) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            task.text = task.text.replace("\r\n", "\n");
            task
        })
        .collect()
}

// Older persisted data carried literal backslash-n sequences from a
// double-encoding bug; decode them back into real newlines.
fn unescape_task_text(mut task: Task) -> Task {
    task.text = task.text.replace("\\n", "\n");
    task
}
