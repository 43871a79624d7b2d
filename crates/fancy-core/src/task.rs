use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Tasks,
    Calendar,
    Dashboard,
}

impl ViewMode {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "tasks" => Some(Self::Tasks),
            "calendar" => Some(Self::Calendar),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Calendar => "calendar",
            Self::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlot {
    pub fn start_hour(&self) -> Option<u32> {
        hour_component(&self.start_time)
    }

    pub fn end_hour(&self) -> Option<u32> {
        hour_component(&self.end_time)
    }

    pub fn range_label(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

fn hour_component(time: &str) -> Option<u32> {
    time.split(':').next()?.trim().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<TimeSlot>,
}

impl Task {
    pub fn new(
        text: String,
        category: String,
        scheduled_time: Option<TimeSlot>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            completed: false,
            category,
            created_at: now,
            scheduled_time,
        }
    }

    // Heading markers are stripped only when followed by whitespace, so
    // "#tag" stays intact while "## Q4 Budget" becomes "Q4 Budget".
    pub fn title(&self) -> String {
        static TITLE_RE: OnceLock<Option<Regex>> = OnceLock::new();
        let first_line = self.text.lines().next().unwrap_or_default();
        match TITLE_RE.get_or_init(|| Regex::new(r"^#+\s").ok()) {
            Some(re) => re.replace(first_line, "").into_owned(),
            None => first_line.to_string(),
        }
    }

    pub fn has_body(&self) -> bool {
        self.text.contains(['\n', '#', '*', '-', '>', '`'])
    }
}

pub fn category_slug(name: &str) -> String {
    static WS_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let lowered = name.to_lowercase();
    match WS_RE.get_or_init(|| Regex::new(r"\s+").ok()) {
        Some(re) => re.replace_all(&lowered, "-").into_owned(),
        None => lowered,
    }
}
