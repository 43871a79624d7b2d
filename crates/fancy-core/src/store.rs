use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::datetime;
use crate::task::{Category, Task, TimeSlot, ViewMode, category_slug};

pub const DEFAULT_ACTIVE_CATEGORY: &str = "today";
pub const DEFAULT_CATEGORY_ICON: &str = "📁";

/// Owns every piece of application state. Commands mutate through the
/// methods here; nothing else writes to the collections. Mutations only
/// mark the store dirty, and the caller decides when to persist.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    active_category: String,
    search_query: String,
    view_mode: ViewMode,
    dirty: bool,
}

impl TaskStore {
    pub fn new(
        tasks: Vec<Task>,
        categories: Vec<Category>,
        active_category: String,
        view_mode: ViewMode,
    ) -> Self {
        Self {
            tasks,
            categories,
            active_category,
            search_query: String::new(),
            view_mode,
            dirty: false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    #[tracing::instrument(skip(self, category, slot, now), fields(text_len = markdown.len()))]
    pub fn create_task(
        &mut self,
        markdown: &str,
        category: Option<&str>,
        slot: Option<TimeSlot>,
        now: DateTime<Utc>,
    ) -> Option<&Task> {
        if markdown.trim().is_empty() {
            debug!("ignoring task with blank text");
            return None;
        }

        let category = category.unwrap_or(&self.active_category).to_string();
        let slot = slot.unwrap_or_else(|| default_slot(now));
        let task = Task::new(markdown.to_string(), category, Some(slot), now);
        info!(id = %task.id, category = %task.category, "created task");
        self.tasks.push(task);
        self.dirty = true;
        self.tasks.last()
    }

    #[tracing::instrument(skip(self), fields(id = id))]
    pub fn toggle_completion(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("no task with that id");
            return false;
        };
        task.completed = !task.completed;
        info!(completed = task.completed, "toggled task");
        self.dirty = true;
        true
    }

    #[tracing::instrument(skip(self, icon), fields(name = name))]
    pub fn create_category(&mut self, name: &str, icon: Option<&str>) -> Option<&Category> {
        if name.trim().is_empty() {
            debug!("ignoring category with blank name");
            return None;
        }

        let category = Category {
            id: category_slug(name),
            name: name.to_string(),
            icon: icon.unwrap_or(DEFAULT_CATEGORY_ICON).to_string(),
        };
        info!(id = %category.id, "created category");
        self.categories.push(category);
        self.dirty = true;
        self.categories.last()
    }

    pub fn set_active_category(&mut self, id: &str) {
        self.active_category = id.to_string();
        self.dirty = true;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.dirty = true;
    }

    // The search query is transient UI state, not one of the persisted
    // keys, so it never dirties the store.
    pub fn set_search_query(&mut self, text: &str) {
        self.search_query = text.to_string();
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

fn default_slot(now: DateTime<Utc>) -> TimeSlot {
    let hour = datetime::app_hour(now);
    TimeSlot {
        date: datetime::app_date(now),
        start_time: datetime::slot_hour_string(hour),
        end_time: datetime::slot_hour_string((hour + 1) % 24),
    }
}
