use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::datetime;
use crate::task::{Category, Task};
use crate::view;

const BAR_WIDTH: usize = 20;
const GRID_TITLE_WIDTH: usize = 14;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn print_header(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let greeting = datetime::header_greeting(datetime::app_hour(now));
        writeln!(out, "{greeting} 👋")?;
        writeln!(out, "It's {}", datetime::format_header_date(now))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, entries, now))]
    pub fn print_task_list(
        &mut self,
        entries: &[(usize, &Task)],
        heading: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{heading}")?;
        writeln!(out)?;
        if entries.is_empty() {
            writeln!(out, "No tasks in this category")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Done".to_string(),
            String::new(),
            "Title".to_string(),
            "Category".to_string(),
            "Schedule".to_string(),
            "Created".to_string(),
        ];

        let mut rows = Vec::with_capacity(entries.len());
        for (position, task) in entries {
            let done = if task.completed {
                self.paint("✓", "32")
            } else {
                "○".to_string()
            };
            let body = if task.has_body() { "+" } else { "" }.to_string();
            let schedule = task
                .scheduled_time
                .as_ref()
                .map(|slot| format!("{} {}", slot.date, slot.range_label()))
                .unwrap_or_default();

            rows.push(vec![
                self.paint(&position.to_string(), "33"),
                done,
                body,
                task.title(),
                task.category.clone(),
                schedule,
                datetime::format_relative(task.created_at, now),
            ]);
        }

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, task, now))]
    pub fn print_task_info(
        &mut self,
        position: Option<usize>,
        task: &Task,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id         {}", task.id)?;
        if let Some(position) = position {
            writeln!(out, "position   {position}")?;
        }
        writeln!(out, "title      {}", task.title())?;
        writeln!(out, "category   {}", task.category)?;
        writeln!(
            out,
            "completed  {}",
            if task.completed { "yes" } else { "no" }
        )?;
        writeln!(
            out,
            "created    {} ({})",
            task.created_at.format("%Y-%m-%dT%H:%M:%SZ"),
            datetime::format_relative(task.created_at, now)
        )?;
        if let Some(slot) = &task.scheduled_time {
            writeln!(out, "scheduled  {} {}", slot.date, slot.range_label())?;
        }

        writeln!(out)?;
        writeln!(out, "{}", task.text)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, categories, tasks))]
    pub fn print_categories(
        &mut self,
        categories: &[Category],
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Icon".to_string(),
            "Name".to_string(),
            "ID".to_string(),
            "Tasks".to_string(),
        ];
        let rows = categories
            .iter()
            .map(|category| {
                vec![
                    category.icon.clone(),
                    category.name.clone(),
                    category.id.clone(),
                    view::category_task_count(tasks, &category.id).to_string(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_week_grid(
        &mut self,
        tasks: &[Task],
        week_origin: NaiveDate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = datetime::app_date(now);
        let current_hour = datetime::app_hour(now);

        let days: Vec<NaiveDate> = (0..7)
            .map(|offset| {
                week_origin
                    .checked_add_signed(Duration::days(offset))
                    .unwrap_or(week_origin)
            })
            .collect();

        writeln!(
            out,
            "{} - {}",
            week_origin.format("%B %-d"),
            days[6].format("%B %-d, %Y")
        )?;
        writeln!(out)?;

        let mut headers = vec![String::new()];
        for day in &days {
            let label = day.format("%a %-d").to_string();
            headers.push(if *day == today {
                self.paint(&label, "33")
            } else {
                label
            });
        }

        let mut rows = Vec::with_capacity(24);
        for hour in 0..24 {
            let label = datetime::hour_label(hour);
            let label = if hour == current_hour {
                self.paint(&label, "33")
            } else {
                label
            };
            let mut row = vec![label];
            for day in &days {
                row.push(self.slot_cell(&view::tasks_for_time_slot(tasks, hour, *day)));
            }
            rows.push(row);
        }

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_dashboard(
        &mut self,
        tasks: &[Task],
        user_name: &str,
        show_24h: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = datetime::app_date(now);
        let current_hour = datetime::app_hour(now);
        let stats = view::stats(tasks, today);

        let greeting = datetime::dashboard_greeting(current_hour);
        writeln!(out, "{greeting}, {user_name} 👋")?;
        writeln!(out)?;

        for (icon, label, value) in [
            ("📊", "Total Tasks", stats.total),
            ("⏳", "Pending Tasks", stats.pending),
            ("🔄", "In Progress", stats.in_progress),
            ("✅", "Completed Tasks", stats.completed),
        ] {
            writeln!(out, "{icon} {label:<16} {value}")?;
        }
        writeln!(out)?;

        writeln!(out, "Task Progress")?;
        writeln!(out, "-------------")?;
        writeln!(out, "{}h Time scheduled", stats.scheduled_hours)?;
        writeln!(out, "{} Tasks completed", stats.completed)?;
        // The progress panel counts everything not completed as pending,
        // unlike the stat cards above.
        writeln!(out, "{} Tasks pending", stats.total - stats.completed)?;
        writeln!(out)?;

        let histogram = view::daily_histogram(tasks, today, view::HISTOGRAM_DAYS);
        let max_count = histogram
            .iter()
            .map(|entry| entry.count)
            .max()
            .unwrap_or(0)
            .max(1);
        for entry in &histogram {
            let mut bar_len = (entry.count * BAR_WIDTH) / max_count;
            if entry.count > 0 {
                bar_len = bar_len.max(1);
            }
            let day_label = entry.day.format("%a").to_string();
            let bar = "█".repeat(bar_len);
            writeln!(out, "{day_label:<4} {bar:<BAR_WIDTH$} {}", entry.count)?;
        }
        writeln!(out)?;

        let title = if show_24h {
            "Daily Schedule (24H)"
        } else {
            "Daily Schedule"
        };
        writeln!(out, "{title}")?;
        writeln!(out, "{}", "-".repeat(title.len()))?;

        let hours: Vec<u32> = if show_24h {
            (0..24).collect()
        } else {
            (9..=17).collect()
        };
        for hour in hours {
            let marker = if hour == current_hour {
                self.paint("▸", "33")
            } else {
                " ".to_string()
            };
            let label = datetime::hour_label(hour);
            let slot_tasks = view::tasks_for_time_slot(tasks, hour, today);

            if slot_tasks.is_empty() {
                writeln!(out, "{marker} {label:>5}  No tasks scheduled")?;
                continue;
            }

            let lines: Vec<String> = slot_tasks
                .iter()
                .map(|task| {
                    let mark = if task.completed {
                        self.paint("✓", "32")
                    } else {
                        "○".to_string()
                    };
                    let range = task
                        .scheduled_time
                        .as_ref()
                        .map(|slot| slot.range_label())
                        .unwrap_or_default();
                    format!("{mark} {}  {range}", first_line(task))
                })
                .collect();
            writeln!(out, "{marker} {label:>5}  {}", lines.join("; "))?;
        }

        Ok(())
    }

    fn slot_cell(&self, slot_tasks: &[&Task]) -> String {
        let Some(first) = slot_tasks.first() else {
            return String::new();
        };

        let title = truncate_cell(first_line(first), GRID_TITLE_WIDTH);
        let range = first
            .scheduled_time
            .as_ref()
            .map(|slot| slot.range_label())
            .unwrap_or_default();
        let mut cell = format!("{title} {range}");
        if slot_tasks.len() > 1 {
            cell.push_str(&format!(" (+{})", slot_tasks.len() - 1));
        }
        if first.completed {
            cell = self.paint(&format!("✓ {cell}"), "32");
        }
        cell
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn first_line(task: &Task) -> &str {
    task.text.lines().next().unwrap_or_default()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write_padded(&mut writer, &headers[idx], widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            write_padded(&mut writer, &row[idx], widths[idx])?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_padded<W: Write>(writer: &mut W, cell: &str, width: usize) -> anyhow::Result<()> {
    let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
    let padding = width.saturating_sub(visible_width);
    write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    Ok(())
}

fn truncate_cell(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{strip_ansi, truncate_cell, write_table};

    #[test]
    fn table_pads_by_display_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["Icon".to_string(), "Name".to_string()],
            vec![
                vec!["🏠".to_string(), "Home".to_string()],
                vec!["x".to_string(), "Completed".to_string()],
            ],
        )
        .expect("write table");

        let rendered = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Icon Name      ");
        assert_eq!(lines[1], "---- --------- ");
        // The emoji is two columns wide, so it gets two fewer pad spaces.
        assert_eq!(lines[2], "🏠   Home      ");
        assert_eq!(lines[3], "x    Completed ");
    }

    #[test]
    fn ansi_codes_do_not_count_toward_width() {
        let painted = "\x1b[32m✓\x1b[0m";
        assert_eq!(strip_ansi(painted), "✓");

        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["Done".to_string()],
            vec![vec![painted.to_string()]],
        )
        .expect("write table");
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.lines().nth(2).expect("row").ends_with("   "));
    }

    #[test]
    fn truncation_is_width_aware() {
        assert_eq!(truncate_cell("short", 10), "short");
        assert_eq!(truncate_cell("a very long title", 8), "a very …");
        assert_eq!(truncate_cell("📅📅📅📅", 5), "📅📅…");
    }
}
