use chrono::{Duration, NaiveDate};

use crate::datetime;
use crate::task::Task;

/// Pseudo-category selecting completed tasks regardless of their actual
/// category.
pub const COMPLETED_CATEGORY: &str = "completed";

pub const HISTOGRAM_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub scheduled_hours: i64,
}

pub fn filtered_tasks<'a>(
    tasks: &'a [Task],
    active_category: &str,
    search_query: &str,
) -> Vec<&'a Task> {
    let query = search_query.to_lowercase();
    tasks
        .iter()
        .filter(|task| {
            if active_category == COMPLETED_CATEGORY {
                task.completed
            } else {
                task.category == active_category
            }
        })
        .filter(|task| query.is_empty() || task.text.to_lowercase().contains(&query))
        .collect()
}

pub fn tasks_for_time_slot<'a>(tasks: &'a [Task], hour: u32, day: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| {
            task.scheduled_time
                .as_ref()
                .is_some_and(|slot| slot.date == day && slot.start_hour() == Some(hour))
        })
        .collect()
}

/// Task counts for the trailing window, oldest day first. A task lands
/// on its schedule date when it has one, otherwise on the day it was
/// created.
pub fn daily_histogram(tasks: &[Task], today: NaiveDate, window_days: u32) -> Vec<DayCount> {
    (0..window_days)
        .map(|offset| {
            let back = i64::from(window_days - 1 - offset);
            let day = today
                .checked_sub_signed(Duration::days(back))
                .unwrap_or(today);
            let count = tasks.iter().filter(|t| effective_date(t) == day).count();
            DayCount { day, count }
        })
        .collect()
}

pub fn stats(tasks: &[Task], today: NaiveDate) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let in_progress = tasks
        .iter()
        .filter(|t| !t.completed)
        .filter(|t| {
            t.scheduled_time
                .as_ref()
                .is_some_and(|slot| slot.date <= today)
        })
        .count();
    let pending = total - completed - in_progress;

    // End-before-start slots subtract hours on purpose; a slot whose
    // hour strings do not parse contributes nothing.
    let scheduled_hours = tasks
        .iter()
        .filter_map(|t| t.scheduled_time.as_ref())
        .filter_map(|slot| Some(i64::from(slot.end_hour()?) - i64::from(slot.start_hour()?)))
        .sum();

    Stats {
        total,
        completed,
        in_progress,
        pending,
        scheduled_hours,
    }
}

pub fn category_task_count(tasks: &[Task], category_id: &str) -> usize {
    if category_id == COMPLETED_CATEGORY {
        tasks.iter().filter(|t| t.completed).count()
    } else {
        tasks.iter().filter(|t| t.category == category_id).count()
    }
}

fn effective_date(task: &Task) -> NaiveDate {
    match &task.scheduled_time {
        Some(slot) => slot.date,
        None => datetime::app_date(task.created_at),
    }
}
