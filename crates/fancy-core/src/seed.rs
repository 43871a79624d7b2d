use chrono::{DateTime, Duration, Utc};

use crate::datetime;
use crate::task::{Category, Task, TimeSlot};

pub fn seed_categories() -> Vec<Category> {
    [
        ("home", "Home", "🏠"),
        ("completed", "Completed", "✅"),
        ("today", "Today", "📅"),
        ("personal", "Personal", "👤"),
        ("work", "Work", "💼"),
    ]
    .into_iter()
    .map(|(id, name, icon)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

pub fn seed_tasks(now: DateTime<Utc>) -> Vec<Task> {
    vec![
        sample(
            now,
            "1",
            "# Client Meeting Preparation\n\n- Finish the sales presentation\n- Prepare talking points\n- Review client history\n\n**Meeting at 2 PM**",
            false,
            "today",
            Duration::hours(2),
            Some(TimeSlot {
                date: datetime::app_date(now),
                start_time: "14:00".to_string(),
                end_time: "15:00".to_string(),
            }),
        ),
        sample(
            now,
            "2",
            "Send follow-up emails to potential leads",
            false,
            "today",
            Duration::hours(5),
            None,
        ),
        sample(
            now,
            "3",
            "## Q4 Marketing Budget\n\n- Review department requests\n- Allocate resources\n- Prepare presentation for board\n\n> Remember to focus on ROI metrics",
            true,
            "today",
            Duration::days(1),
            None,
        ),
        sample(
            now,
            "4",
            "Attend the team meeting at 10:30 AM",
            true,
            "today",
            Duration::days(2),
            None,
        ),
        sample(
            now,
            "5",
            "# Exercise Plan\n\n1. 10 min warm-up\n2. 15 min cardio\n3. 15 min strength\n\n*Remember to stretch afterward*",
            false,
            "personal",
            Duration::days(3),
            None,
        ),
    ]
}

fn sample(
    now: DateTime<Utc>,
    id: &str,
    text: &str,
    completed: bool,
    category: &str,
    age: Duration,
    slot: Option<TimeSlot>,
) -> Task {
    Task {
        id: id.to_string(),
        text: text.to_string(),
        completed,
        category: category.to_string(),
        created_at: now - age,
        scheduled_time: slot,
    }
}
